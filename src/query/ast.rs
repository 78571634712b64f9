//! Abstract syntax tree for traversal queries

use serde_json::Value;
use std::fmt;

/// A parsed query: FOR/FILTER clauses in order, then one RETURN expression
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub clauses: Vec<Clause>,
    pub returns: Expression,
}

/// One FOR or FILTER clause
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `FOR variable IN FUNCTION(@graph, start, @options)`
    For {
        variable: String,
        function: GraphFunction,
        graph: String,
        start: StartArgument,
        options: String,
    },
    /// `FILTER condition`
    Filter(Condition),
}

/// Graph enumeration functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFunction {
    Edges,
    Vertices,
    Neighbors,
}

impl fmt::Display for GraphFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphFunction::Edges => write!(f, "GRAPH_EDGES"),
            GraphFunction::Vertices => write!(f, "GRAPH_VERTICES"),
            GraphFunction::Neighbors => write!(f, "GRAPH_NEIGHBORS"),
        }
    }
}

/// Second argument of a graph function
#[derive(Debug, Clone, PartialEq)]
pub enum StartArgument {
    /// `@name`
    Bind(String),
    /// `{}` (every vertex of the graph)
    AnyVertex,
    /// A variable or attribute path of the current row
    Path(PathExpression),
}

/// `variable.attr.attr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    pub variable: String,
    pub attributes: Vec<String>,
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variable)?;
        for attribute in &self.attributes {
            write!(f, ".{}", attribute)?;
        }
        Ok(())
    }
}

/// FILTER condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `MATCHES(target, [examples])`
    Matches {
        target: PathExpression,
        examples: Value,
    },
    /// `a == b || c == d ...`
    AnyEqual(Vec<(PathExpression, PathExpression)>),
}

/// RETURN expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Path(PathExpression),
    List(Vec<Expression>),
    Flatten(Box<Expression>),
    Slice(Box<Expression>, usize),
}
