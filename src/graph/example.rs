//! Example filters and collection restrictions

use super::error::{GraphError, GraphResult};
use crate::store::ID_FIELD;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Filter specification used to match documents
///
/// The empty attribute map matches every document.
#[derive(Debug, Clone, PartialEq)]
pub enum Example {
    /// Match one document by `_id`
    ById(String),
    /// Match documents whose attributes equal all of these
    ByAttributes(Map<String, Value>),
    /// Match documents matching any of these
    AnyOf(Vec<Example>),
}

impl Example {
    /// Match-all example
    pub fn all() -> Self {
        Example::ByAttributes(Map::new())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Example::ById(id.into())
    }

    /// Attribute example from a JSON object
    pub fn attributes(value: Value) -> GraphResult<Self> {
        match value {
            Value::Object(map) => Ok(Example::ByAttributes(map)),
            other => Err(GraphError::InvalidExampleType(other.to_string())),
        }
    }

    /// Normalize any JSON example (string, object, array or null)
    pub fn from_value(value: &Value) -> GraphResult<Self> {
        normalize_example(Some(value))
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Example::ByAttributes(map) if map.is_empty())
    }

    /// JSON form bound into queries
    pub fn to_value(&self) -> Value {
        match self {
            Example::ById(id) => {
                let mut map = Map::new();
                map.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                Value::Object(map)
            }
            Example::ByAttributes(map) => Value::Object(map.clone()),
            Example::AnyOf(examples) => Value::Array(examples.iter().map(Example::to_value).collect()),
        }
    }

    /// JSON array form, wrapping a single example
    pub fn to_examples(&self) -> Value {
        match self {
            Example::AnyOf(_) => self.to_value(),
            single => Value::Array(vec![single.to_value()]),
        }
    }
}

impl Default for Example {
    fn default() -> Self {
        Example::all()
    }
}

impl fmt::Display for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl From<&str> for Example {
    fn from(id: &str) -> Self {
        Example::ById(id.to_string())
    }
}

impl From<String> for Example {
    fn from(id: String) -> Self {
        Example::ById(id)
    }
}

impl From<Map<String, Value>> for Example {
    fn from(map: Map<String, Value>) -> Self {
        Example::ByAttributes(map)
    }
}

impl From<Vec<Example>> for Example {
    fn from(examples: Vec<Example>) -> Self {
        Example::AnyOf(examples)
    }
}

impl TryFrom<Value> for Example {
    type Error = GraphError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        normalize_example(Some(&value))
    }
}

/// Turn a loosely typed example into an [`Example`]
///
/// Absent or null means match-all; a string is an `_id`; an object is an
/// attribute map; an array is normalized element-wise.
pub fn normalize_example(value: Option<&Value>) -> GraphResult<Example> {
    match value {
        None | Some(Value::Null) => Ok(Example::all()),
        Some(Value::String(id)) => Ok(Example::ById(id.clone())),
        Some(Value::Object(map)) => Ok(Example::ByAttributes(map.clone())),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| normalize_example(Some(item)))
            .collect::<GraphResult<Vec<_>>>()
            .map(Example::AnyOf),
        Some(other) => Err(GraphError::InvalidExampleType(other.to_string())),
    }
}

/// Every requested collection must be declared
///
/// The error names exactly the unknown collections.
pub fn check_restriction(
    declared: &BTreeSet<String>,
    requested: &[String],
    context: &str,
) -> GraphResult<()> {
    let unknown: Vec<&str> = requested
        .iter()
        .filter(|name| !declared.contains(*name))
        .map(String::as_str)
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(GraphError::BadParameter(format!(
            "{}: {} are not known to the graph",
            context,
            unknown.join(" and ")
        )))
    }
}
