//! Configuration for the graph layer
//!
//! Defaults work out of the box; a YAML file can override any subset of the
//! fields:
//!
//! ```yaml
//! graphs_collection: _graphs
//! count_results: true
//! max_cascade_size: 10000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Name of the meta collection holding graph definitions
pub const DEFAULT_GRAPHS_COLLECTION: &str = "_graphs";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid YAML for [`GraphConfig`]
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A field holds a value that is syntactically fine but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Graph layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Meta collection in which graph definitions are persisted, keyed by name
    pub graphs_collection: String,
    /// Ask the query engine to count results when creating a cursor
    pub count_results: bool,
    /// Upper bound on the number of documents a single cascading delete may
    /// collect (None = unbounded)
    pub max_cascade_size: Option<usize>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            graphs_collection: DEFAULT_GRAPHS_COLLECTION.to_string(),
            count_results: true,
            max_cascade_size: None,
        }
    }
}

impl GraphConfig {
    /// Parse a configuration from YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: GraphConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Set the cascade bound
    pub fn with_max_cascade_size(mut self, limit: usize) -> Self {
        self.max_cascade_size = Some(limit);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.graphs_collection.is_empty() {
            return Err(ConfigError::Invalid(
                "graphs_collection must not be empty".to_string(),
            ));
        }
        if self.graphs_collection.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "graphs_collection '{}' must not contain '/'",
                self.graphs_collection
            )));
        }
        if self.max_cascade_size == Some(0) {
            return Err(ConfigError::Invalid(
                "max_cascade_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.graphs_collection, "_graphs");
        assert!(config.count_results);
        assert_eq!(config.max_cascade_size, None);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = GraphConfig::from_yaml_str("max_cascade_size: 50\n").unwrap();
        assert_eq!(config.max_cascade_size, Some(50));
        assert_eq!(config.graphs_collection, "_graphs");
        assert!(config.count_results);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            GraphConfig::from_yaml_str("graphs_collection: \"\"\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GraphConfig::from_yaml_str("max_cascade_size: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            GraphConfig::from_yaml_str("count_results: [1, 2]\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "graphs_collection: graph_meta").unwrap();
        writeln!(file, "count_results: false").unwrap();

        let config = GraphConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.graphs_collection, "graph_meta");
        assert!(!config.count_results);
    }
}
