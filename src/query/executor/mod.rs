//! In-memory query execution
//!
//! Rows flow clause by clause: a FOR clause expands every row by the items
//! its graph function yields, a FILTER clause drops rows, and RETURN maps
//! each remaining row to one result.

mod functions;
pub mod record;

pub use record::Record;

use crate::config::DEFAULT_GRAPHS_COLLECTION;
use crate::query::ast::{Clause, Condition, Expression, GraphFunction, Query, StartArgument};
use crate::query::{
    parse_query, BindVars, Cursor, QueryEngine, QueryError, QueryOptions, QueryResult, VecCursor,
};
use crate::store::DocumentStore;
use functions::{matches_examples, GraphScan, GraphView, TraversalOptions};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Query engine evaluating traversal queries against a document store
#[derive(Clone)]
pub struct MemoryQueryEngine {
    store: Arc<dyn DocumentStore>,
    graphs_collection: String,
}

impl MemoryQueryEngine {
    /// Create an engine reading graph definitions from the default meta collection
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_graphs_collection(store, DEFAULT_GRAPHS_COLLECTION)
    }

    pub fn with_graphs_collection(
        store: Arc<dyn DocumentStore>,
        graphs_collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            graphs_collection: graphs_collection.into(),
        }
    }

    /// Evaluate a parsed query
    pub fn execute(&self, query: &Query, bind_vars: &BindVars) -> QueryResult<Vec<Value>> {
        let mut graphs: HashMap<String, GraphView> = HashMap::new();
        let mut rows = vec![Record::new()];

        for clause in &query.clauses {
            match clause {
                Clause::For {
                    variable,
                    function,
                    graph,
                    start,
                    options,
                } => {
                    let name = bind_string(bind_vars, graph)?;
                    if !graphs.contains_key(&name) {
                        let view =
                            GraphView::load(self.store.as_ref(), &self.graphs_collection, &name)?;
                        graphs.insert(name.clone(), view);
                    }
                    let scan = GraphScan {
                        store: self.store.as_ref(),
                        graph: &graphs[&name],
                    };
                    let options = TraversalOptions::from_value(bind_value(bind_vars, options)?)?;

                    let mut expanded = Vec::new();
                    for row in &rows {
                        let start = match start {
                            StartArgument::Bind(param) => bind_value(bind_vars, param)?.clone(),
                            StartArgument::AnyVertex => Value::Object(Map::new()),
                            StartArgument::Path(path) => row.resolve(path)?,
                        };
                        let items = match function {
                            GraphFunction::Vertices => scan.vertices(&start, &options)?,
                            GraphFunction::Edges => scan.edges(&start, &options)?,
                            GraphFunction::Neighbors => scan.neighbors(&start, &options)?,
                        };
                        expanded.extend(items.into_iter().map(|item| row.with(variable, item)));
                    }
                    debug!("{} {} yielded {} rows", variable, function, expanded.len());
                    rows = expanded;
                }
                Clause::Filter(condition) => {
                    let mut kept = Vec::with_capacity(rows.len());
                    for row in rows {
                        if evaluate_condition(&row, condition)? {
                            kept.push(row);
                        }
                    }
                    rows = kept;
                }
            }
        }

        rows.iter()
            .map(|row| evaluate_expression(row, &query.returns))
            .collect()
    }
}

impl QueryEngine for MemoryQueryEngine {
    fn query(
        &self,
        text: &str,
        bind_vars: &BindVars,
        options: &QueryOptions,
    ) -> QueryResult<Box<dyn Cursor>> {
        debug!("Executing query: {}", text);
        let query = parse_query(text)?;
        let results = self.execute(&query, bind_vars)?;
        Ok(Box::new(VecCursor::new(results, options.count)))
    }
}

fn bind_value<'a>(bind_vars: &'a BindVars, name: &str) -> QueryResult<&'a Value> {
    bind_vars
        .get(name)
        .ok_or_else(|| QueryError::UnboundParameter(name.to_string()))
}

fn bind_string(bind_vars: &BindVars, name: &str) -> QueryResult<String> {
    bind_value(bind_vars, name)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| QueryError::TypeError(format!("bind parameter '{}' must be a string", name)))
}

fn evaluate_condition(row: &Record, condition: &Condition) -> QueryResult<bool> {
    match condition {
        Condition::Matches { target, examples } => {
            Ok(matches_examples(&row.resolve(target)?, examples))
        }
        Condition::AnyEqual(pairs) => {
            for (left, right) in pairs {
                if row.resolve(left)? == row.resolve(right)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn evaluate_expression(row: &Record, expression: &Expression) -> QueryResult<Value> {
    match expression {
        Expression::Path(path) => row.resolve(path),
        Expression::List(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| evaluate_expression(row, item))
                .collect::<QueryResult<Vec<_>>>()?,
        )),
        Expression::Flatten(inner) => match evaluate_expression(row, inner)? {
            Value::Array(items) => {
                let mut flat = Vec::new();
                for item in items {
                    match item {
                        Value::Array(nested) => flat.extend(nested),
                        other => flat.push(other),
                    }
                }
                Ok(Value::Array(flat))
            }
            other => Err(QueryError::TypeError(format!("FLATTEN expects a list, got {}", other))),
        },
        Expression::Slice(inner, offset) => match evaluate_expression(row, inner)? {
            Value::Array(items) => Ok(Value::Array(items.into_iter().skip(*offset).collect())),
            Value::Null => Ok(Value::Array(Vec::new())),
            other => Err(QueryError::TypeError(format!("SLICE expects a list, got {}", other))),
        },
    }
}
