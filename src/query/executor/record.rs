//! Row bindings produced while evaluating FOR clauses

use crate::query::ast::PathExpression;
use crate::query::{QueryError, QueryResult};
use serde_json::Value;
use std::collections::HashMap;

/// A single row: loop variable name -> bound document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    bindings: HashMap<String, Value>,
}

impl Record {
    /// Create a new empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable to a value
    pub fn bind(&mut self, variable: impl Into<String>, value: Value) {
        self.bindings.insert(variable.into(), value);
    }

    /// Copy of this record with one more binding
    pub fn with(&self, variable: &str, value: Value) -> Self {
        let mut record = self.clone();
        record.bind(variable, value);
        record
    }

    /// Get a bound value
    pub fn get(&self, variable: &str) -> Option<&Value> {
        self.bindings.get(variable)
    }

    /// Evaluate `variable.attr.attr`; missing attributes yield null
    pub fn resolve(&self, path: &PathExpression) -> QueryResult<Value> {
        let mut current = self
            .get(&path.variable)
            .ok_or_else(|| QueryError::UnknownVariable(path.variable.clone()))?;
        for attribute in &path.attributes {
            match current.get(attribute.as_str()) {
                Some(value) => current = value,
                None => return Ok(Value::Null),
            }
        }
        Ok(current.clone())
    }
}
