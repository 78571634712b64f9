//! GRAPH_VERTICES / GRAPH_EDGES / GRAPH_NEIGHBORS evaluation

use crate::graph::{Direction, GraphDefinition};
use crate::query::{QueryError, QueryResult};
use crate::store::{Document, DocumentId, DocumentStore, ID_FIELD};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Options bound to a graph function call
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct TraversalOptions {
    pub direction: Option<Direction>,
    pub edge_examples: Option<Value>,
    pub neighbor_examples: Option<Value>,
    pub edge_collection_restriction: Option<Vec<String>>,
    pub vertex_collection_restriction: Option<Vec<String>>,
}

impl TraversalOptions {
    pub fn from_value(value: &Value) -> QueryResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            other => serde_json::from_value(other.clone())
                .map_err(|e| QueryError::TypeError(format!("invalid traversal options: {}", e))),
        }
    }
}

/// Collections of one named graph
#[derive(Debug, Clone)]
pub(crate) struct GraphView {
    edge_collections: BTreeSet<String>,
    vertex_collections: BTreeSet<String>,
}

impl GraphView {
    /// Read a graph definition from the meta collection
    pub fn load(store: &dyn DocumentStore, graphs_collection: &str, name: &str) -> QueryResult<Self> {
        let document = store
            .document(&DocumentId::new(graphs_collection, name))
            .map_err(|e| {
                if e.is_not_found() {
                    QueryError::GraphNotFound(name.to_string())
                } else {
                    QueryError::Store(e)
                }
            })?;
        let definition: GraphDefinition = serde_json::from_value(document.into_value())
            .map_err(|e| QueryError::TypeError(format!("malformed graph {}: {}", name, e)))?;
        Ok(Self {
            edge_collections: definition.edge_collection_names(),
            vertex_collections: definition.vertex_collection_names(),
        })
    }
}

fn restricted<'a>(
    declared: &'a BTreeSet<String>,
    restriction: &'a Option<Vec<String>>,
) -> impl Iterator<Item = &'a String> + 'a {
    declared
        .iter()
        .filter(move |name| restriction.as_ref().map_or(true, |r| r.contains(*name)))
}

/// Whether `document` matches `examples`
///
/// Null, `{}` and `[]` match everything. An array matches when any element
/// does; an object when every attribute is equal; a string compares `_id`.
pub(crate) fn matches_examples(document: &Value, examples: &Value) -> bool {
    match examples {
        Value::Null => true,
        Value::Array(items) => items.is_empty() || items.iter().any(|e| matches_examples(document, e)),
        Value::Object(attributes) => attributes
            .iter()
            .all(|(key, expected)| document.get(key.as_str()) == Some(expected)),
        Value::String(id) => document.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str()),
        _ => false,
    }
}

/// Other endpoint of `edge` when it leaves/enters `id` in `direction`
fn other_endpoint<'e>(edge: &'e Document, id: &str, direction: Direction) -> Option<&'e str> {
    let from = edge.edge_from()?;
    let to = edge.edge_to()?;
    match direction {
        Direction::Outbound => (from == id).then_some(to),
        Direction::Inbound => (to == id).then_some(from),
        Direction::Any if from == id => Some(to),
        Direction::Any => (to == id).then_some(from),
    }
}

/// Evaluates graph functions for one graph
pub(crate) struct GraphScan<'a> {
    pub store: &'a dyn DocumentStore,
    pub graph: &'a GraphView,
}

impl GraphScan<'_> {
    /// GRAPH_VERTICES: vertices of the graph matching `example`
    pub fn vertices(&self, example: &Value, options: &TraversalOptions) -> QueryResult<Vec<Value>> {
        let mut result = Vec::new();
        for collection in restricted(
            &self.graph.vertex_collections,
            &options.vertex_collection_restriction,
        ) {
            for document in self.store.all(collection)? {
                let value = document.into_value();
                if matches_examples(&value, example) {
                    result.push(value);
                }
            }
        }
        Ok(result)
    }

    /// GRAPH_EDGES: edges connected to the start vertices
    pub fn edges(&self, start: &Value, options: &TraversalOptions) -> QueryResult<Vec<Value>> {
        let direction = options.direction.unwrap_or(Direction::Any);
        let examples = options.edge_examples.clone().unwrap_or(Value::Null);
        let edges = self.load_edges(options)?;

        let mut result = Vec::new();
        for vertex in self.start_vertices(start)? {
            let Some(id) = vertex.get(ID_FIELD).and_then(Value::as_str) else {
                continue;
            };
            for edge in &edges {
                if other_endpoint(edge, id, direction).is_none() {
                    continue;
                }
                let value = edge.clone().into_value();
                if matches_examples(&value, &examples) {
                    result.push(value);
                }
            }
        }
        Ok(result)
    }

    /// GRAPH_NEIGHBORS: `{vertex, path: {vertices, edges}}` per adjacent vertex
    pub fn neighbors(&self, start: &Value, options: &TraversalOptions) -> QueryResult<Vec<Value>> {
        let direction = options.direction.unwrap_or(Direction::Any);
        let edge_examples = options.edge_examples.clone().unwrap_or(Value::Null);
        let neighbor_examples = options.neighbor_examples.clone().unwrap_or(Value::Null);
        let edges = self.load_edges(options)?;

        let mut result = Vec::new();
        for vertex in self.start_vertices(start)? {
            let Some(id) = vertex.get(ID_FIELD).and_then(Value::as_str) else {
                continue;
            };
            for edge in &edges {
                let Some(other) = other_endpoint(edge, id, direction) else {
                    continue;
                };
                let edge_value = edge.clone().into_value();
                if !matches_examples(&edge_value, &edge_examples) {
                    continue;
                }
                let Some(neighbor) = self.lookup(other)? else {
                    continue;
                };
                if let Some(restriction) = &options.vertex_collection_restriction {
                    let collection = other.split('/').next().unwrap_or_default();
                    if !restriction.iter().any(|r| r == collection) {
                        continue;
                    }
                }
                if !matches_examples(&neighbor, &neighbor_examples) {
                    continue;
                }
                result.push(json!({
                    "vertex": neighbor,
                    "path": {
                        "vertices": [vertex.clone(), neighbor.clone()],
                        "edges": [edge_value],
                    },
                }));
            }
        }
        Ok(result)
    }

    fn load_edges(&self, options: &TraversalOptions) -> QueryResult<Vec<Document>> {
        let mut edges = Vec::new();
        for collection in restricted(
            &self.graph.edge_collections,
            &options.edge_collection_restriction,
        ) {
            edges.extend(self.store.all(collection)?);
        }
        Ok(edges)
    }

    fn lookup(&self, handle: &str) -> QueryResult<Option<Value>> {
        let Ok(id) = DocumentId::parse(handle) else {
            return Ok(None);
        };
        match self.store.document(&id) {
            Ok(document) => Ok(Some(document.into_value())),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a start argument to vertex documents
    fn start_vertices(&self, start: &Value) -> QueryResult<Vec<Value>> {
        match start {
            Value::Null => Ok(Vec::new()),
            Value::String(handle) => Ok(self.lookup(handle)?.into_iter().collect()),
            Value::Array(items) => {
                let mut vertices = Vec::new();
                for item in items {
                    vertices.extend(self.start_vertices(item)?);
                }
                Ok(vertices)
            }
            Value::Object(map) if map.contains_key(ID_FIELD) => Ok(vec![start.clone()]),
            Value::Object(_) => self.vertices(start, &TraversalOptions::default()),
            other => Err(QueryError::TypeError(format!(
                "invalid start vertex {}",
                other
            ))),
        }
    }
}
