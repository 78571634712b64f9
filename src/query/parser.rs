//! Traversal query parser using Pest

use crate::query::ast::*;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "query/traversal.pest"]
struct TraversalParser;

/// Parser errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Pest parsing error
    #[error("Parse error: {0}")]
    PestError(#[from] Box<pest::error::Error<Rule>>),

    /// Embedded JSON literal could not be decoded
    #[error("Invalid JSON literal: {0}")]
    Json(#[from] serde_json::Error),

    /// Semantic error
    #[error("Semantic error: {0}")]
    SemanticError(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a traversal query string into an AST
pub fn parse_query(input: &str) -> ParseResult<Query> {
    let mut pairs = TraversalParser::parse(Rule::query, input).map_err(Box::new)?;
    let root = pairs
        .next()
        .ok_or_else(|| ParseError::SemanticError("empty query".to_string()))?;

    let mut clauses = Vec::new();
    let mut returns = None;
    for inner in root.into_inner() {
        match inner.as_rule() {
            Rule::for_clause => clauses.push(parse_for_clause(inner)?),
            Rule::filter_clause => clauses.push(parse_filter_clause(inner)?),
            Rule::return_clause => {
                let expr = first_inner(inner, "RETURN")?;
                returns = Some(parse_expression(expr)?);
            }
            _ => {}
        }
    }

    let returns =
        returns.ok_or_else(|| ParseError::SemanticError("missing RETURN".to_string()))?;
    Ok(Query { clauses, returns })
}

fn first_inner<'a>(pair: Pair<'a, Rule>, context: &str) -> ParseResult<Pair<'a, Rule>> {
    pair.into_inner()
        .next()
        .ok_or_else(|| ParseError::SemanticError(format!("incomplete {}", context)))
}

fn parse_for_clause(pair: Pair<Rule>) -> ParseResult<Clause> {
    let mut inner = pair.into_inner();
    let mut next = |what: &str| {
        inner
            .next()
            .ok_or_else(|| ParseError::SemanticError(format!("FOR clause without {}", what)))
    };

    let variable = next("variable")?.as_str().to_string();
    let function = match next("function")?.as_str() {
        "GRAPH_EDGES" => GraphFunction::Edges,
        "GRAPH_VERTICES" => GraphFunction::Vertices,
        "GRAPH_NEIGHBORS" => GraphFunction::Neighbors,
        other => {
            return Err(ParseError::SemanticError(format!(
                "unknown graph function {}",
                other
            )))
        }
    };
    let graph = parse_bind_param(next("graph argument")?)?;
    let start = parse_start_argument(next("start argument")?)?;
    let options = parse_bind_param(next("options argument")?)?;

    Ok(Clause::For {
        variable,
        function,
        graph,
        start,
        options,
    })
}

fn parse_bind_param(pair: Pair<Rule>) -> ParseResult<String> {
    Ok(first_inner(pair, "bind parameter")?.as_str().to_string())
}

fn parse_start_argument(pair: Pair<Rule>) -> ParseResult<StartArgument> {
    let inner = first_inner(pair, "start argument")?;
    match inner.as_rule() {
        Rule::bind_param => Ok(StartArgument::Bind(parse_bind_param(inner)?)),
        Rule::empty_object => Ok(StartArgument::AnyVertex),
        Rule::path_expr => Ok(StartArgument::Path(parse_path(inner))),
        other => Err(ParseError::SemanticError(format!(
            "unexpected start argument {:?}",
            other
        ))),
    }
}

fn parse_filter_clause(pair: Pair<Rule>) -> ParseResult<Clause> {
    let inner = first_inner(pair, "FILTER")?;
    let condition = match inner.as_rule() {
        Rule::matches_call => {
            let mut parts = inner.into_inner();
            let target = parts
                .next()
                .map(parse_path)
                .ok_or_else(|| ParseError::SemanticError("MATCHES without target".into()))?;
            let literal = parts
                .next()
                .ok_or_else(|| ParseError::SemanticError("MATCHES without examples".into()))?;
            Condition::Matches {
                target,
                examples: serde_json::from_str(literal.as_str())?,
            }
        }
        Rule::equality_chain => {
            let mut pairs = Vec::new();
            for equality in inner.into_inner() {
                let mut sides = equality.into_inner().map(parse_path);
                match (sides.next(), sides.next()) {
                    (Some(left), Some(right)) => pairs.push((left, right)),
                    _ => {
                        return Err(ParseError::SemanticError(
                            "comparison needs two operands".to_string(),
                        ))
                    }
                }
            }
            Condition::AnyEqual(pairs)
        }
        other => {
            return Err(ParseError::SemanticError(format!(
                "unexpected filter {:?}",
                other
            )))
        }
    };
    Ok(Clause::Filter(condition))
}

fn parse_expression(pair: Pair<Rule>) -> ParseResult<Expression> {
    // expr wraps exactly one alternative
    let inner = match pair.as_rule() {
        Rule::expr => first_inner(pair, "expression")?,
        _ => pair,
    };

    match inner.as_rule() {
        Rule::path_expr => Ok(Expression::Path(parse_path(inner))),
        Rule::list_expr => Ok(Expression::List(
            inner
                .into_inner()
                .map(parse_expression)
                .collect::<ParseResult<Vec<_>>>()?,
        )),
        Rule::flatten_call => {
            let arg = first_inner(inner, "FLATTEN")?;
            Ok(Expression::Flatten(Box::new(parse_expression(arg)?)))
        }
        Rule::slice_call => {
            let mut parts = inner.into_inner();
            let (arg, offset) = match (parts.next(), parts.next()) {
                (Some(arg), Some(offset)) => (arg, offset),
                _ => return Err(ParseError::SemanticError("SLICE needs two arguments".into())),
            };
            let offset = offset
                .as_str()
                .parse::<usize>()
                .map_err(|e| ParseError::SemanticError(format!("bad SLICE offset: {}", e)))?;
            Ok(Expression::Slice(Box::new(parse_expression(arg)?), offset))
        }
        other => Err(ParseError::SemanticError(format!(
            "unexpected expression {:?}",
            other
        ))),
    }
}

fn parse_path(pair: Pair<Rule>) -> PathExpression {
    let mut idents = pair.into_inner().map(|p| p.as_str().to_string());
    let variable = idents.next().unwrap_or_default();
    PathExpression {
        variable,
        attributes: idents.collect(),
    }
}
