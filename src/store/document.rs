//! Documents and document handles

use super::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// System attribute holding the `collection/key` handle
pub const ID_FIELD: &str = "_id";
/// System attribute holding the key within the collection
pub const KEY_FIELD: &str = "_key";
/// Edge attribute holding the source handle
pub const FROM_FIELD: &str = "_from";
/// Edge attribute holding the target handle
pub const TO_FIELD: &str = "_to";

/// Fully qualified document handle (`collection/key`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId {
    collection: String,
    key: String,
}

impl DocumentId {
    /// Build a handle from its parts
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        DocumentId {
            collection: collection.into(),
            key: key.into(),
        }
    }

    /// Parse a `collection/key` handle
    pub fn parse(handle: &str) -> StoreResult<Self> {
        match handle.split_once('/') {
            Some((collection, key))
                if !collection.is_empty() && !key.is_empty() && !key.contains('/') =>
            {
                Ok(DocumentId::new(collection, key))
            }
            _ => Err(StoreError::BadHandle(handle.to_string())),
        }
    }

    /// Accept either a full handle or a bare key within `collection`
    pub fn resolve(collection: &str, id_or_key: &str) -> StoreResult<Self> {
        if id_or_key.contains('/') {
            Self::parse(id_or_key)
        } else if id_or_key.is_empty() {
            Err(StoreError::BadHandle(id_or_key.to_string()))
        } else {
            Ok(DocumentId::new(collection, id_or_key))
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

impl FromStr for DocumentId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentId::parse(s)
    }
}

/// A JSON document
///
/// System attributes (`_id`, `_key`, and `_from`/`_to` for edges) live next
/// to user attributes, the way the query engine sees them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Document(Map::new())
    }

    /// Convert a JSON value; only objects are documents
    pub fn from_value(value: Value) -> StoreResult<Self> {
        match value {
            Value::Object(map) => Ok(Document(map)),
            other => Err(StoreError::InvalidDocument(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    /// The `_id` handle, if assigned
    pub fn id(&self) -> Option<&str> {
        self.get_str(ID_FIELD)
    }

    /// The `_id` handle parsed
    pub fn handle(&self) -> StoreResult<DocumentId> {
        let id = self
            .id()
            .ok_or_else(|| StoreError::InvalidDocument("document has no _id".to_string()))?;
        DocumentId::parse(id)
    }

    /// The `_key`, if assigned
    pub fn key(&self) -> Option<&str> {
        self.get_str(KEY_FIELD)
    }

    /// Source handle of an edge
    pub fn edge_from(&self) -> Option<&str> {
        self.get_str(FROM_FIELD)
    }

    /// Target handle of an edge
    pub fn edge_to(&self) -> Option<&str> {
        self.get_str(TO_FIELD)
    }

    /// Whether this edge has `id` as either endpoint
    pub fn touches(&self, id: &str) -> bool {
        self.edge_from() == Some(id) || self.edge_to() == Some(id)
    }

    /// Get an attribute
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.0.get(attribute)
    }

    /// Set an attribute
    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(attribute.into(), value.into());
    }

    /// Remove an attribute
    pub fn remove(&mut self, attribute: &str) -> Option<Value> {
        self.0.remove(attribute)
    }

    /// Copy every attribute of `patch` over this document
    pub fn merge(&mut self, patch: Document) {
        for (key, value) in patch.0 {
            self.0.insert(key, value);
        }
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    fn get_str(&self, attribute: &str) -> Option<&str> {
        self.0.get(attribute).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Document(map)
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        document.into_value()
    }
}

impl TryFrom<Value> for Document {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Document::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_handle() {
        let id = DocumentId::parse("female/alice").unwrap();
        assert_eq!(id.collection(), "female");
        assert_eq!(id.key(), "alice");
        assert_eq!(id.to_string(), "female/alice");

        assert!(DocumentId::parse("alice").is_err());
        assert!(DocumentId::parse("/alice").is_err());
        assert!(DocumentId::parse("female/").is_err());
        assert!(DocumentId::parse("a/b/c").is_err());
    }

    #[test]
    fn test_resolve_key_or_handle() {
        assert_eq!(
            DocumentId::resolve("male", "bob").unwrap(),
            DocumentId::new("male", "bob")
        );
        assert_eq!(
            DocumentId::resolve("male", "female/alice").unwrap(),
            DocumentId::new("female", "alice")
        );
        assert!(DocumentId::resolve("male", "").is_err());
    }

    #[test]
    fn test_document_accessors() {
        let mut doc = Document::from_value(json!({
            "_id": "relation/1",
            "_key": "1",
            "_from": "female/alice",
            "_to": "male/bob",
            "type": "married"
        }))
        .unwrap();

        assert_eq!(doc.id(), Some("relation/1"));
        assert_eq!(doc.key(), Some("1"));
        assert!(doc.touches("male/bob"));
        assert!(!doc.touches("male/charly"));
        assert_eq!(doc.handle().unwrap(), DocumentId::new("relation", "1"));

        doc.merge(Document::from_value(json!({"type": "divorced", "year": 2020})).unwrap());
        assert_eq!(doc.get("type"), Some(&json!("divorced")));
        assert_eq!(doc.get("year"), Some(&json!(2020)));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            Document::from_value(json!([1, 2])),
            Err(StoreError::InvalidDocument(_))
        ));
    }
}
