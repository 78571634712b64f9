//! Gharial: named graphs over shared document/edge collections
//!
//! A graph is a named set of edge definitions (relations) plus orphan vertex
//! collections, persisted in a meta collection of the document store. Several
//! graphs may share the same collections; this crate keeps them structurally
//! consistent:
//! - Edge definitions are validated against every persisted graph before any
//!   collection is provisioned or any definition is written
//! - Edge inserts are checked against the relation's from/to sets
//! - Removing a vertex or an edge removes every edge that transitively
//!   references it, in one transaction, across all graphs
//!
//! Read-side traversals are built with [`GraphQuery`], a fluent builder that
//! compiles chained calls into query text plus bind variables and hands them
//! to a [`QueryEngine`].
//!
//! # Collaborators
//!
//! Storage, transactions and query execution are traits ([`DocumentStore`],
//! [`TransactionExecutor`], [`QueryEngine`]). [`MemoryStore`] and
//! [`MemoryQueryEngine`] implement them in memory.
//!
//! ## Example Usage
//!
//! ```rust
//! use gharial::{directed_relation, Database, Example, GraphRegistry};
//! use serde_json::json;
//!
//! let registry = GraphRegistry::new(Database::in_memory()).unwrap();
//! let relation = directed_relation("relation", ["female", "male"], ["female", "male"]).unwrap();
//! let graph = registry.create("social", vec![relation], vec![]).unwrap();
//!
//! let alice = graph.vertex_collection("female").unwrap()
//!     .insert(json!({"_key": "alice", "name": "Alice"})).unwrap();
//! let bob = graph.vertex_collection("male").unwrap()
//!     .insert(json!({"_key": "bob", "name": "Bob"})).unwrap();
//! graph.edge_collection("relation").unwrap()
//!     .insert("female/alice", "male/bob", json!({"type": "married"})).unwrap();
//!
//! let mut query = graph.vertices(Example::attributes(json!({"name": "Alice"})).unwrap());
//! let spouses = query.out_edges(Example::all()).to_vertices(Example::all()).to_array().unwrap();
//! assert_eq!(spouses[0]["name"], "Bob");
//! # let _ = (alice, bob);
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod graph;
pub mod query;
pub mod store;
pub mod telemetry;

// Re-export main types for convenience
pub use config::{ConfigError, GraphConfig};
pub use database::Database;

pub use graph::{
    check_restriction, directed_relation, edge_definitions, extend_edge_definitions,
    normalize_example, undirected_relation, CollectionList, Direction, EdgeCollection, Example,
    GraphDefinition, GraphError, GraphHandle, GraphQuery, GraphRegistry, GraphResult,
    RelationDefinition, RelationIndex, Statement, StatementKind, VertexCollection,
};

pub use query::{
    BindVars, Cursor, MemoryQueryEngine, QueryEngine, QueryError, QueryOptions, QueryResult,
    VecCursor,
};

pub use store::{
    CollectionKind, Document, DocumentId, DocumentStore, MemoryStore, StoreError, StoreResult,
    TransactionCollections, TransactionExecutor,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
