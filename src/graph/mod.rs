//! General graph layer
//!
//! This module implements named graphs over shared collections:
//! - Relations and graph definitions, persisted in a meta collection
//! - A registry creating, loading and dropping graphs
//! - Graph handles with structural edits and validated collection access
//! - Cascading deletes across every graph sharing a collection
//! - The fluent traversal query builder

pub mod builder;
pub mod cascade;
pub mod collection;
pub mod definition;
pub mod error;
pub mod example;
pub mod handle;
pub mod index;
pub mod registry;
pub mod relation;

mod catalog;
mod edit;
mod provision;

// Re-export main types
pub use builder::{Direction, GraphQuery, Statement, StatementKind};
pub use cascade::RemovalPlan;
pub use collection::{CollectionHandle, EdgeCollection, VertexCollection};
pub use definition::GraphDefinition;
pub use error::{GraphError, GraphResult};
pub use example::{check_restriction, normalize_example, Example};
pub use handle::GraphHandle;
pub use index::RelationIndex;
pub use registry::GraphRegistry;
pub use relation::{
    directed_relation, edge_definitions, extend_edge_definitions, undirected_relation,
    CollectionList, RelationDefinition,
};
