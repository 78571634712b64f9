//! Loaded graph instance

use super::builder::GraphQuery;
use super::catalog::Catalog;
use super::collection::{EdgeCollection, VertexCollection};
use super::definition::GraphDefinition;
use super::error::{GraphError, GraphResult};
use super::example::{normalize_example, Example};
use super::relation::RelationDefinition;
use crate::config::GraphConfig;
use crate::database::Database;
use crate::store::{Document, DocumentId};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Definition plus derived collection sets, rebuilt after every edit
#[derive(Debug, Clone)]
struct GraphState {
    definition: GraphDefinition,
    vertex_collections: BTreeSet<String>,
    edge_collections: BTreeSet<String>,
}

impl From<GraphDefinition> for GraphState {
    fn from(definition: GraphDefinition) -> Self {
        Self {
            vertex_collections: definition.vertex_collection_names(),
            edge_collections: definition.edge_collection_names(),
            definition,
        }
    }
}

/// A named graph, loaded from the meta collection
///
/// Obtained from [`GraphRegistry::create`](super::GraphRegistry::create) or
/// [`GraphRegistry::graph`](super::GraphRegistry::graph).
pub struct GraphHandle {
    db: Database,
    config: Arc<GraphConfig>,
    catalog: Arc<Catalog>,
    state: GraphState,
}

impl GraphHandle {
    pub(crate) fn new(
        db: Database,
        config: Arc<GraphConfig>,
        catalog: Arc<Catalog>,
        definition: GraphDefinition,
    ) -> Self {
        Self {
            db,
            config,
            catalog,
            state: definition.into(),
        }
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub(crate) fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub(crate) fn rebind(&mut self, definition: GraphDefinition) {
        self.state = definition.into();
    }

    pub fn name(&self) -> &str {
        &self.state.definition.name
    }

    pub fn definition(&self) -> &GraphDefinition {
        &self.state.definition
    }

    pub fn edge_definitions(&self) -> &[RelationDefinition] {
        &self.state.definition.edge_definitions
    }

    pub fn orphan_collections(&self) -> &[String] {
        &self.state.definition.orphan_collections
    }

    /// Edge collection names
    pub fn edge_collections(&self) -> &BTreeSet<String> {
        &self.state.edge_collections
    }

    /// Vertex collection names, orphans included
    pub fn vertex_collections(&self) -> &BTreeSet<String> {
        &self.state.vertex_collections
    }

    /// Re-read the definition, picking up edits made through other handles
    pub fn refresh(&mut self) -> GraphResult<()> {
        let definition = self.catalog.get(self.name())?;
        self.rebind(definition);
        Ok(())
    }

    pub fn vertex_collection(&self, name: &str) -> GraphResult<VertexCollection<'_>> {
        self.state
            .vertex_collections
            .get(name)
            .map(|name| VertexCollection::new(self, name))
            .ok_or_else(|| GraphError::VertexCollectionDoesNotExist(name.to_string()))
    }

    pub fn edge_collection(&self, name: &str) -> GraphResult<EdgeCollection<'_>> {
        self.state
            .definition
            .relation(name)
            .map(|relation| EdgeCollection::new(self, relation))
            .ok_or_else(|| GraphError::EdgeCollectionNotUsed(name.to_string()))
    }

    /// Traversal seeded with the outbound edges of every vertex
    pub fn edges(&self, example: impl Into<Example>) -> GraphQuery {
        let mut query = GraphQuery::new(self);
        query.out_edges(example);
        query
    }

    /// Traversal seeded with the vertices matching `example`
    pub fn vertices(&self, example: impl Into<Example>) -> GraphQuery {
        let mut query = GraphQuery::new(self);
        query.vertices(example);
        query
    }

    /// Neighbors of the vertices matching `example`
    ///
    /// `options` takes the traversal options of
    /// [`GraphQuery::neighbors_with_options`]; `neighborExamples` filters the
    /// neighbors themselves.
    pub fn neighbors(
        &self,
        example: impl Into<Example>,
        options: Map<String, Value>,
    ) -> GraphResult<Vec<Value>> {
        let neighbor_examples = normalize_example(options.get("neighborExamples"))?;
        let mut query = GraphQuery::new(self);
        query
            .vertices(example)
            .neighbors_with_options(neighbor_examples, options);
        query.to_array()
    }

    /// Edges of the graph touching `vertex_id` in either direction
    pub fn edges_of(&self, vertex_id: &str) -> GraphResult<Vec<Document>> {
        self.scan_edges(vertex_id, |edge, id| edge.touches(id))
    }

    /// Edges of the graph ending at `vertex_id`
    pub fn in_edges_of(&self, vertex_id: &str) -> GraphResult<Vec<Document>> {
        self.scan_edges(vertex_id, |edge, id| edge.edge_to() == Some(id))
    }

    /// Edges of the graph starting at `vertex_id`
    pub fn out_edges_of(&self, vertex_id: &str) -> GraphResult<Vec<Document>> {
        self.scan_edges(vertex_id, |edge, id| edge.edge_from() == Some(id))
    }

    fn scan_edges<F>(&self, vertex_id: &str, keep: F) -> GraphResult<Vec<Document>>
    where
        F: Fn(&Document, &str) -> bool,
    {
        let id = DocumentId::parse(vertex_id)
            .map_err(|_| GraphError::BadDocumentHandle(vertex_id.to_string()))?;
        let handle = id.to_string();
        let mut result = Vec::new();
        for collection in &self.state.edge_collections {
            result.extend(
                self.db
                    .store()
                    .all(collection)?
                    .into_iter()
                    .filter(|edge| keep(edge, &handle)),
            );
        }
        Ok(result)
    }

    /// Source vertex of an edge
    pub fn from_vertex(&self, edge_id: &str) -> GraphResult<Document> {
        self.endpoint(edge_id, Document::edge_from)
    }

    /// Target vertex of an edge
    pub fn to_vertex(&self, edge_id: &str) -> GraphResult<Document> {
        self.endpoint(edge_id, Document::edge_to)
    }

    fn endpoint(&self, edge_id: &str, side: fn(&Document) -> Option<&str>) -> GraphResult<Document> {
        let id = DocumentId::parse(edge_id)
            .map_err(|_| GraphError::BadDocumentHandle(edge_id.to_string()))?;
        if !self.state.edge_collections.contains(id.collection()) {
            return Err(GraphError::EdgeCollectionNotUsed(id.collection().to_string()));
        }
        let edge = self.db.store().document(&id)?;
        let vertex = side(&edge)
            .ok_or_else(|| GraphError::BadDocumentHandle(format!("{} has no endpoint", edge_id)))?;
        let vertex_id = DocumentId::parse(vertex)
            .map_err(|_| GraphError::BadDocumentHandle(vertex.to_string()))?;
        Ok(self.db.store().document(&vertex_id)?)
    }
}

impl fmt::Display for GraphHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.state.definition, f)
    }
}

impl fmt::Debug for GraphHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphHandle")
            .field("definition", &self.state.definition)
            .finish()
    }
}
