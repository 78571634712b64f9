//! Query execution collaborator
//!
//! The graph query builder produces query text plus bind variables and hands
//! them to a [`QueryEngine`]. [`MemoryQueryEngine`] evaluates that dialect
//! against a [`DocumentStore`](crate::store::DocumentStore):
//! - `FOR x IN GRAPH_EDGES / GRAPH_VERTICES / GRAPH_NEIGHBORS(...)`
//! - `FILTER MATCHES(x, [...])` and `FILTER a == b || c == d`
//! - `RETURN x`, `RETURN [a, b]`, `RETURN FLATTEN([...])`, `SLICE(x, n)`

pub mod ast;
pub mod cursor;
pub mod executor;
pub mod parser;

pub use ast::Query;
pub use cursor::{Cursor, VecCursor};
pub use executor::{MemoryQueryEngine, Record};
pub use parser::{parse_query, ParseError, ParseResult};

use crate::store::StoreError;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Bind variables, keyed without the leading `@`
pub type BindVars = BTreeMap<String, Value>;

/// Per-query options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Report the total result count on the cursor
    pub count: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self { count: true }
    }
}

/// Query errors
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Bind parameter '{0}' was not declared")]
    UnboundParameter(String),

    #[error("Variable '{0}' is not defined")]
    UnknownVariable(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Query execution engine
pub trait QueryEngine: Send + Sync {
    /// Run `text` with `bind_vars`, returning a cursor over the results
    fn query(
        &self,
        text: &str,
        bind_vars: &BindVars,
        options: &QueryOptions,
    ) -> QueryResult<Box<dyn Cursor>>;
}
