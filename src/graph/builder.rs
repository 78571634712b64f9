//! Fluent traversal query builder
//!
//! Chained calls push [`Statement`]s onto a stack. Each loop statement binds
//! a fresh `options_N` variable; `N` comes from a counter that only grows, so
//! bind names never collide. The query text is the statements in call order
//! followed by one RETURN clause chosen by the most recent `path*()` marker.
//!
//! ```text
//! graph.vertices({name: "Alice"}).outEdges().toVertices()
//!
//! FOR vertices_0 IN GRAPH_VERTICES(@graphName,@vertexExample_0,@options_0)
//! FOR edges_1 IN GRAPH_EDGES(@graphName,vertices_0,@options_1)
//! FOR vertices_2 IN GRAPH_VERTICES(@graphName,@vertexExample_2,@options_2)
//! FILTER edges_1._to == vertices_2._id
//! RETURN vertices_2
//! ```

use super::error::{GraphError, GraphResult};
use super::example::{check_restriction, Example};
use super::handle::GraphHandle;
use super::relation::CollectionList;
use crate::database::Database;
use crate::query::{BindVars, Cursor, QueryOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Edge direction relative to the start vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Any,
    Outbound,
    Inbound,
}

/// Kind of a statement on the builder stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Edge,
    Vertex,
    Neighbor,
    Filter,
    Path,
    PathVertices,
    PathEdges,
}

impl StatementKind {
    /// Statements whose options `restrict` can amend
    pub fn allows_restrict(self) -> bool {
        matches!(
            self,
            StatementKind::Edge | StatementKind::Vertex | StatementKind::Neighbor
        )
    }

    /// Markers selecting the RETURN clause
    pub fn is_render_mode(self) -> bool {
        matches!(
            self,
            StatementKind::Path | StatementKind::PathVertices | StatementKind::PathEdges
        )
    }
}

/// One fragment of the generated query
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    kind: StatementKind,
    text: String,
    options_key: Option<String>,
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Bind variable holding this statement's options
    pub fn options_key(&self) -> Option<&str> {
        self.options_key.as_deref()
    }
}

/// Fluent traversal over one graph
///
/// Results are fetched lazily: the first of `to_array`, `count`, `has_next`
/// or `next` runs the query and keeps the cursor. Any later chain call
/// disposes that cursor.
pub struct GraphQuery {
    db: Database,
    graph_name: String,
    edge_collections: BTreeSet<String>,
    vertex_collections: BTreeSet<String>,
    count_results: bool,

    statements: Vec<Statement>,
    calls: Vec<String>,
    bind_vars: BindVars,
    counter: usize,
    last_var: Option<String>,
    path: Vec<String>,
    path_vertices: Vec<String>,
    path_edges: Vec<String>,
    cursor: Option<Box<dyn Cursor>>,
}

impl GraphQuery {
    pub(crate) fn new(graph: &GraphHandle) -> Self {
        let mut bind_vars = BindVars::new();
        bind_vars.insert("graphName".to_string(), Value::String(graph.name().to_string()));
        Self {
            db: graph.db().clone(),
            graph_name: graph.name().to_string(),
            edge_collections: graph.edge_collections().clone(),
            vertex_collections: graph.vertex_collections().clone(),
            count_results: graph.config().count_results,
            statements: Vec::new(),
            calls: Vec::new(),
            bind_vars,
            counter: 0,
            last_var: None,
            path: Vec::new(),
            path_vertices: Vec::new(),
            path_edges: Vec::new(),
            cursor: None,
        }
    }

    fn next_index(&mut self) -> usize {
        let index = self.counter;
        self.counter += 1;
        index
    }

    fn clear_cursor(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.dispose();
        }
    }

    fn record_call(&mut self, name: &str, example: Option<&Example>) {
        let argument = match example {
            Some(example) if !example.is_match_all() => example.to_string(),
            _ => String::new(),
        };
        self.calls.push(format!("{}({})", name, argument));
    }

    fn push(&mut self, kind: StatementKind, text: String, options_key: Option<String>) {
        self.statements.push(Statement {
            kind,
            text,
            options_key,
        });
    }

    fn start_var(&self) -> String {
        self.last_var.clone().unwrap_or_else(|| "{}".to_string())
    }

    fn push_edges(&mut self, call: &str, direction: Direction, example: Example) -> &mut Self {
        self.record_call(call, Some(&example));
        self.clear_cursor();

        let index = self.next_index();
        let var = format!("edges_{}", index);
        let options_key = format!("options_{}", index);
        let text = format!(
            "FOR {} IN GRAPH_EDGES(@graphName,{},@{})",
            var,
            self.start_var(),
            options_key
        );
        self.bind_vars.insert(
            options_key.clone(),
            json!({"direction": direction, "edgeExamples": example.to_examples()}),
        );
        self.push(StatementKind::Edge, text, Some(options_key));

        self.path.push(var.clone());
        self.path_edges.push(var.clone());
        self.last_var = Some(var);
        self
    }

    /// Edges in either direction of the previous selection
    pub fn edges(&mut self, example: impl Into<Example>) -> &mut Self {
        self.push_edges("edges", Direction::Any, example.into())
    }

    /// Edges leaving the previous selection
    pub fn out_edges(&mut self, example: impl Into<Example>) -> &mut Self {
        self.push_edges("outEdges", Direction::Outbound, example.into())
    }

    /// Edges entering the previous selection
    pub fn in_edges(&mut self, example: impl Into<Example>) -> &mut Self {
        self.push_edges("inEdges", Direction::Inbound, example.into())
    }

    fn push_vertices(&mut self, call: &str, join: &[&str], example: Example) -> &mut Self {
        self.record_call(call, Some(&example));
        self.clear_cursor();
        let edge_var = self.last_var.clone();

        let index = self.next_index();
        let var = format!("vertices_{}", index);
        let example_key = format!("vertexExample_{}", index);
        let options_key = format!("options_{}", index);
        let text = format!(
            "FOR {} IN GRAPH_VERTICES(@graphName,@{},@{})",
            var, example_key, options_key
        );
        self.bind_vars.insert(example_key, example.to_value());
        self.bind_vars
            .insert(options_key.clone(), Value::Object(Map::new()));
        self.push(StatementKind::Vertex, text, Some(options_key));

        if let Some(edge_var) = edge_var {
            let condition = join
                .iter()
                .map(|field| format!("{}.{} == {}._id", edge_var, field, var))
                .collect::<Vec<_>>()
                .join(" || ");
            self.next_index();
            self.push(StatementKind::Filter, format!("FILTER {}", condition), None);
        }

        self.path.push(var.clone());
        self.path_vertices.push(var.clone());
        self.last_var = Some(var);
        self
    }

    /// Vertices matching `example`; after edges, only their endpoints
    pub fn vertices(&mut self, example: impl Into<Example>) -> &mut Self {
        self.push_vertices("vertices", &["_from", "_to"], example.into())
    }

    /// Source vertices of the previous edges
    pub fn from_vertices(&mut self, example: impl Into<Example>) -> &mut Self {
        self.push_vertices("fromVertices", &["_from"], example.into())
    }

    /// Target vertices of the previous edges
    pub fn to_vertices(&mut self, example: impl Into<Example>) -> &mut Self {
        self.push_vertices("toVertices", &["_to"], example.into())
    }

    /// Vertices adjacent to the previous selection
    pub fn neighbors(&mut self, example: impl Into<Example>) -> &mut Self {
        self.neighbors_with_options(example, Map::new())
    }

    /// Like [`neighbors`](Self::neighbors) with extra traversal options
    /// (`direction`, `edgeExamples`, ...)
    pub fn neighbors_with_options(
        &mut self,
        example: impl Into<Example>,
        mut options: Map<String, Value>,
    ) -> &mut Self {
        let example = example.into();
        self.record_call("neighbors", Some(&example));
        self.clear_cursor();

        let index = self.next_index();
        let var = format!("neighbors_{}", index);
        let options_key = format!("options_{}", index);
        let text = format!(
            "FOR {} IN GRAPH_NEIGHBORS(@graphName,{},@{})",
            var,
            self.start_var(),
            options_key
        );
        options.insert("neighborExamples".to_string(), example.to_value());
        self.bind_vars
            .insert(options_key.clone(), Value::Object(options));
        self.push(StatementKind::Neighbor, text, Some(options_key));

        self.path.push(format!("{}.path", var));
        self.path_vertices
            .push(format!("SLICE({}.path.vertices, 1)", var));
        self.path_edges.push(format!("{}.path.edges", var));
        self.last_var = Some(format!("{}.vertex", var));
        self
    }

    /// Limit the nearest edge, vertex or neighbor statement to some collections
    ///
    /// Edge statements take edge collections, the others vertex collections.
    /// Unknown names fail with `BadParameter` naming them; nothing changes.
    pub fn restrict(&mut self, collections: impl Into<CollectionList>) -> GraphResult<&mut Self> {
        let requested = collections.into().into_vec();
        let (kind, options_key) = self
            .statements
            .iter()
            .rev()
            .find(|s| s.kind.allows_restrict())
            .and_then(|s| s.options_key.clone().map(|key| (s.kind, key)))
            .ok_or_else(|| {
                GraphError::BadParameter(
                    "restrict needs a preceding edge, vertex or neighbor selection".to_string(),
                )
            })?;

        let (declared, context, option) = if kind == StatementKind::Edge {
            (&self.edge_collections, "edge collections", "edgeCollectionRestriction")
        } else {
            (&self.vertex_collections, "vertex collections", "vertexCollectionRestriction")
        };
        check_restriction(declared, &requested, context)?;

        self.calls
            .push(format!("restrict({})", Value::from(requested.clone())));
        self.clear_cursor();

        let options = self
            .bind_vars
            .entry(options_key)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = options {
            let entry = map
                .entry(option.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(list) = entry {
                list.extend(requested.into_iter().map(Value::String));
            }
        }
        Ok(self)
    }

    /// Keep only results of the previous step matching `example`
    pub fn filter(&mut self, example: impl Into<Example>) -> GraphResult<&mut Self> {
        let last_var = self.last_var.clone().ok_or_else(|| {
            GraphError::BadParameter(
                "filter needs a preceding edge, vertex or neighbor selection".to_string(),
            )
        })?;
        let example = example.into();
        self.record_call("filter", Some(&example));
        self.clear_cursor();
        self.next_index();
        let text = format!("FILTER MATCHES({},{})", last_var, example.to_examples());
        self.push(StatementKind::Filter, text, None);
        Ok(self)
    }

    fn push_marker(&mut self, call: &str, kind: StatementKind) -> &mut Self {
        self.record_call(call, None);
        self.clear_cursor();
        self.next_index();
        self.push(kind, String::new(), None);
        self
    }

    /// Return the full path of every result
    pub fn path(&mut self) -> &mut Self {
        self.push_marker("path", StatementKind::Path)
    }

    /// Return the vertices along every path
    pub fn path_vertices(&mut self) -> &mut Self {
        self.push_marker("pathVertices", StatementKind::PathVertices)
    }

    /// Return the edges along every path
    pub fn path_edges(&mut self) -> &mut Self {
        self.push_marker("pathEdges", StatementKind::PathEdges)
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn bind_vars(&self) -> &BindVars {
        &self.bind_vars
    }

    /// Loop variable the next step starts from
    pub fn last_var(&self) -> Option<&str> {
        self.last_var.as_deref()
    }

    /// Statement texts in call order, without the RETURN clause
    pub fn print_query(&self) -> String {
        self.statements
            .iter()
            .filter(|s| !s.text.is_empty())
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Full query text as dispatched to the query engine
    pub fn query_text(&self) -> String {
        let mode = self
            .statements
            .iter()
            .rev()
            .map(|s| s.kind)
            .find(|kind| kind.is_render_mode());
        let returns = match mode {
            Some(StatementKind::Path) => format!("[{}]", self.path.join(",")),
            Some(StatementKind::PathVertices) => {
                format!("FLATTEN([{}])", self.path_vertices.join(","))
            }
            Some(StatementKind::PathEdges) => format!("FLATTEN([{}])", self.path_edges.join(",")),
            _ => self.last_var.clone().unwrap_or_else(|| "[]".to_string()),
        };
        format!("{} RETURN {}", self.print_query(), returns)
    }

    /// Run the query, returning a fresh cursor
    pub fn execute(&mut self) -> GraphResult<Box<dyn Cursor>> {
        self.clear_cursor();
        let text = self.query_text();
        debug!("Dispatching graph query on {}: {}", self.graph_name, text);
        let options = QueryOptions {
            count: self.count_results,
        };
        Ok(self.db.queries().query(&text, &self.bind_vars, &options)?)
    }

    fn cursor(&mut self) -> GraphResult<&mut Box<dyn Cursor>> {
        if self.cursor.is_none() {
            let cursor = self.execute()?;
            self.cursor = Some(cursor);
        }
        self.cursor
            .as_mut()
            .ok_or_else(|| GraphError::BadParameter("query cursor unavailable".to_string()))
    }

    /// Every remaining result
    pub fn to_array(&mut self) -> GraphResult<Vec<Value>> {
        Ok(self.cursor()?.to_array())
    }

    /// Total number of results
    pub fn count(&mut self) -> GraphResult<usize> {
        self.cursor()?.count().ok_or_else(|| {
            GraphError::BadParameter("query engine did not count the results".to_string())
        })
    }

    pub fn has_next(&mut self) -> GraphResult<bool> {
        Ok(self.cursor()?.has_next())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> GraphResult<Option<Value>> {
        Ok(self.cursor()?.next())
    }
}

impl fmt::Display for GraphQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ GraphAQL {}", self.graph_name)?;
        for call in &self.calls {
            write!(f, ".{}", call)?;
        }
        write!(f, " ]")
    }
}

impl fmt::Debug for GraphQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQuery")
            .field("graph", &self.graph_name)
            .field("statements", &self.statements)
            .field("bind_vars", &self.bind_vars)
            .field("cursor", &self.cursor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::registry::GraphRegistry;
    use crate::graph::relation::directed_relation;

    fn social() -> GraphHandle {
        let registry = GraphRegistry::new(Database::in_memory()).unwrap();
        registry
            .create(
                "social",
                vec![directed_relation("relation", ["female", "male"], ["female", "male"]).unwrap()],
                vec![],
            )
            .unwrap()
    }

    #[test]
    fn test_vertex_edge_vertex_text() {
        let graph = social();
        let mut query = graph.vertices(Example::attributes(json!({"name": "Alice"})).unwrap());
        query.out_edges(Example::all()).to_vertices(Example::all());

        assert_eq!(
            query.print_query(),
            "FOR vertices_0 IN GRAPH_VERTICES(@graphName,@vertexExample_0,@options_0) \
             FOR edges_1 IN GRAPH_EDGES(@graphName,vertices_0,@options_1) \
             FOR vertices_2 IN GRAPH_VERTICES(@graphName,@vertexExample_2,@options_2) \
             FILTER edges_1._to == vertices_2._id"
        );
        assert_eq!(query.last_var(), Some("vertices_2"));
        assert_eq!(query.bind_vars()["graphName"], json!("social"));
        assert_eq!(query.bind_vars()["vertexExample_0"], json!({"name": "Alice"}));
        assert_eq!(
            query.bind_vars()["options_1"],
            json!({"direction": "outbound", "edgeExamples": [{}]})
        );
        assert!(query.query_text().ends_with(" RETURN vertices_2"));
    }

    #[test]
    fn test_edges_seed_and_joins() {
        let graph = social();
        let mut query = graph.edges(Example::all());
        assert_eq!(
            query.print_query(),
            "FOR edges_0 IN GRAPH_EDGES(@graphName,{},@options_0)"
        );

        query.vertices(Example::all());
        assert!(query
            .print_query()
            .ends_with("FILTER edges_0._from == vertices_1._id || edges_0._to == vertices_1._id"));

        let mut query = graph.edges("relation/1");
        query.from_vertices(Example::all());
        assert!(query.print_query().ends_with("FILTER edges_0._from == vertices_1._id"));
        assert_eq!(
            query.bind_vars()["options_0"]["edgeExamples"],
            json!([{"_id": "relation/1"}])
        );
    }

    #[test]
    fn test_counter_skips_filters() {
        let graph = social();
        let mut query = graph.vertices(Example::all());
        query
            .filter(Example::attributes(json!({"age": 30})).unwrap())
            .unwrap()
            .in_edges(Example::all());

        assert!(query
            .print_query()
            .contains("FILTER MATCHES(vertices_0,[{\"age\":30}])"));
        assert!(query
            .print_query()
            .ends_with("FOR edges_2 IN GRAPH_EDGES(@graphName,vertices_0,@options_2)"));
        assert_eq!(query.statements()[1].kind(), StatementKind::Filter);
    }

    #[test]
    fn test_selection_required_before_filter() {
        let graph = social();
        let mut query = GraphQuery::new(&graph);
        let err = query.filter(Example::all()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "bad parameter: filter needs a preceding edge, vertex or neighbor selection"
        );
        assert!(query.statements().is_empty());
        assert_eq!(query.print_query(), "");
        assert!(query.restrict("male").unwrap_err().is_bad_parameter());
    }

    #[test]
    fn test_neighbors_nested_shape() {
        let graph = social();
        let mut query = graph.vertices("female/alice");
        let mut options = Map::new();
        options.insert("direction".to_string(), json!("outbound"));
        query.neighbors_with_options(Example::all(), options);

        assert_eq!(query.last_var(), Some("neighbors_1.vertex"));
        assert!(query
            .print_query()
            .ends_with("FOR neighbors_1 IN GRAPH_NEIGHBORS(@graphName,vertices_0,@options_1)"));
        assert_eq!(
            query.bind_vars()["options_1"],
            json!({"direction": "outbound", "neighborExamples": {}})
        );

        query.path_vertices();
        assert!(query
            .query_text()
            .ends_with(" RETURN FLATTEN([vertices_0,SLICE(neighbors_1.path.vertices, 1)])"));
    }

    #[test]
    fn test_path_markers_only_change_return() {
        let graph = social();
        let mut query = graph.vertices(Example::all());
        query.out_edges(Example::all()).to_vertices(Example::all());
        let body = query.print_query();

        query.path();
        assert_eq!(query.print_query(), body);
        assert_eq!(
            query.query_text(),
            format!("{} RETURN [vertices_0,edges_1,vertices_2]", body)
        );

        query.path_edges();
        assert_eq!(query.print_query(), body);
        assert_eq!(query.query_text(), format!("{} RETURN FLATTEN([edges_1])", body));
    }

    #[test]
    fn test_restrict_validates_against_statement_kind() {
        let graph = social();

        let mut query = graph.edges(Example::all());
        query.restrict("relation").unwrap();
        assert_eq!(
            query.bind_vars()["options_0"]["edgeCollectionRestriction"],
            json!(["relation"])
        );
        let err = query.restrict(["female", "relation"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "bad parameter: edge collections: female are not known to the graph"
        );

        let mut query = graph.vertices(Example::all());
        query.filter(Example::all()).unwrap();
        query.restrict(["male"]).unwrap().restrict("female").unwrap();
        assert_eq!(
            query.bind_vars()["options_0"]["vertexCollectionRestriction"],
            json!(["male", "female"])
        );
        let err = query.restrict(["robots", "aliens"]).unwrap_err();
        assert!(err.is_bad_parameter());
        assert!(err.to_string().contains("robots and aliens"));
    }

    #[test]
    fn test_call_chain_display() {
        let graph = social();
        let mut query = graph.vertices(Example::attributes(json!({"name": "Alice"})).unwrap());
        query.out_edges(Example::all()).restrict("relation").unwrap();
        query.path();
        assert_eq!(
            query.to_string(),
            "[ GraphAQL social.vertices({\"name\":\"Alice\"}).outEdges().restrict([\"relation\"]).path() ]"
        );
    }
}
