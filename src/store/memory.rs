//! In-memory document store
//!
//! Collections keep documents in insertion order (`IndexMap`) so that
//! scans and query results are deterministic.

use super::document::{Document, DocumentId, FROM_FIELD, ID_FIELD, KEY_FIELD, TO_FIELD};
use super::{CollectionKind, DocumentStore, StoreError, StoreResult};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone)]
pub(crate) struct MemoryCollection {
    kind: CollectionKind,
    documents: IndexMap<String, Document>,
    next_key: u64,
}

impl MemoryCollection {
    fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            documents: IndexMap::new(),
            next_key: 1,
        }
    }

    fn generate_key(&mut self) -> String {
        loop {
            let key = self.next_key.to_string();
            self.next_key += 1;
            if !self.documents.contains_key(&key) {
                return key;
            }
        }
    }
}

/// Collections of JSON documents held in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
    /// Serializes transactions against each other
    transaction_lock: Mutex<()>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<String, MemoryCollection>>> {
        self.collections
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<String, MemoryCollection>>> {
        self.collections
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    pub(crate) fn begin(&self) -> StoreResult<MutexGuard<'_, ()>> {
        self.transaction_lock
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    /// Copy the current state of the named collections
    pub(crate) fn snapshot(
        &self,
        names: &[String],
    ) -> StoreResult<HashMap<String, Option<MemoryCollection>>> {
        let collections = self.read()?;
        Ok(names
            .iter()
            .map(|name| (name.clone(), collections.get(name).cloned()))
            .collect())
    }

    /// Put snapshotted collections back in place
    pub(crate) fn restore(
        &self,
        snapshot: HashMap<String, Option<MemoryCollection>>,
    ) -> StoreResult<()> {
        let mut collections = self.write()?;
        for (name, state) in snapshot {
            match state {
                Some(collection) => {
                    collections.insert(name, collection);
                }
                None => {
                    collections.remove(&name);
                }
            }
        }
        Ok(())
    }

    fn validate_edge(document: &Document) -> StoreResult<()> {
        for field in [FROM_FIELD, TO_FIELD] {
            let handle = document
                .get(field)
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::InvalidDocument(format!("edge has no {}", field)))?;
            DocumentId::parse(handle)?;
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    fn collection_kind(&self, name: &str) -> Option<CollectionKind> {
        self.read().ok()?.get(name).map(|c| c.kind)
    }

    fn create_collection(&self, name: &str, kind: CollectionKind) -> StoreResult<()> {
        if name.is_empty() || name.contains('/') {
            return Err(StoreError::BadHandle(name.to_string()));
        }
        let mut collections = self.write()?;
        if collections.contains_key(name) {
            return Err(StoreError::DuplicateCollection(name.to_string()));
        }
        collections.insert(name.to_string(), MemoryCollection::new(kind));
        debug!("Created {} collection {}", kind, name);
        Ok(())
    }

    fn drop_collection(&self, name: &str) -> StoreResult<()> {
        let mut collections = self.write()?;
        collections
            .remove(name)
            .map(|_| debug!("Dropped collection {}", name))
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.read() {
            Ok(collections) => collections.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    fn insert(&self, collection: &str, mut document: Document) -> StoreResult<Document> {
        let mut collections = self.write()?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        if target.kind == CollectionKind::Edge {
            Self::validate_edge(&document)?;
        }

        let key = match document.get(KEY_FIELD) {
            None => target.generate_key(),
            Some(Value::String(key)) if !key.is_empty() && !key.contains('/') => key.clone(),
            Some(other) => {
                return Err(StoreError::InvalidDocument(format!("illegal _key {}", other)))
            }
        };
        if target.documents.contains_key(&key) {
            return Err(StoreError::DuplicateKey(format!("{}/{}", collection, key)));
        }

        document.set(KEY_FIELD, key.clone());
        document.set(ID_FIELD, format!("{}/{}", collection, key));
        target.documents.insert(key, document.clone());
        Ok(document)
    }

    fn document(&self, id: &DocumentId) -> StoreResult<Document> {
        let collections = self.read()?;
        collections
            .get(id.collection())
            .ok_or_else(|| StoreError::CollectionNotFound(id.collection().to_string()))?
            .documents
            .get(id.key())
            .cloned()
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))
    }

    fn replace(&self, id: &DocumentId, mut document: Document) -> StoreResult<Document> {
        let mut collections = self.write()?;
        let target = collections
            .get_mut(id.collection())
            .ok_or_else(|| StoreError::CollectionNotFound(id.collection().to_string()))?;
        let kind = target.kind;
        let existing = target
            .documents
            .get_mut(id.key())
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))?;

        document.set(KEY_FIELD, id.key());
        document.set(ID_FIELD, id.to_string());
        if kind == CollectionKind::Edge {
            for field in [FROM_FIELD, TO_FIELD] {
                if document.get(field).is_none() {
                    if let Some(value) = existing.get(field).cloned() {
                        document.set(field, value);
                    }
                }
            }
            Self::validate_edge(&document)?;
        }
        *existing = document.clone();
        Ok(document)
    }

    fn update(&self, id: &DocumentId, mut patch: Document) -> StoreResult<Document> {
        patch.remove(ID_FIELD);
        patch.remove(KEY_FIELD);

        let mut collections = self.write()?;
        let target = collections
            .get_mut(id.collection())
            .ok_or_else(|| StoreError::CollectionNotFound(id.collection().to_string()))?;
        let kind = target.kind;
        let existing = target
            .documents
            .get_mut(id.key())
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))?;

        let mut updated = existing.clone();
        updated.merge(patch);
        if kind == CollectionKind::Edge {
            Self::validate_edge(&updated)?;
        }
        *existing = updated.clone();
        Ok(updated)
    }

    fn remove(&self, id: &DocumentId) -> StoreResult<()> {
        let mut collections = self.write()?;
        collections
            .get_mut(id.collection())
            .ok_or_else(|| StoreError::CollectionNotFound(id.collection().to_string()))?
            .documents
            .shift_remove(id.key())
            .map(|_| ())
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))
    }

    fn all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let collections = self.read()?;
        collections
            .get(collection)
            .map(|c| c.documents.values().cloned().collect())
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))
    }

    fn count(&self, collection: &str) -> StoreResult<usize> {
        let collections = self.read()?;
        collections
            .get(collection)
            .map(|c| c.documents.len())
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_create_and_drop_collection() {
        let store = MemoryStore::new();
        store.create_collection("female", CollectionKind::Document).unwrap();
        assert_eq!(store.collection_kind("female"), Some(CollectionKind::Document));
        assert!(matches!(
            store.create_collection("female", CollectionKind::Edge),
            Err(StoreError::DuplicateCollection(_))
        ));

        store.drop_collection("female").unwrap();
        assert_eq!(store.collection_kind("female"), None);
        assert!(store.drop_collection("female").unwrap_err().is_not_found());
    }

    #[test]
    fn test_insert_generates_keys() {
        let store = MemoryStore::new();
        store.create_collection("male", CollectionKind::Document).unwrap();

        let first = store.insert("male", doc(json!({"name": "Bob"}))).unwrap();
        let second = store.insert("male", doc(json!({"name": "Charly"}))).unwrap();
        assert_eq!(first.id(), Some("male/1"));
        assert_eq!(second.id(), Some("male/2"));

        let named = store.insert("male", doc(json!({"_key": "bob"}))).unwrap();
        assert_eq!(named.id(), Some("male/bob"));
        assert!(matches!(
            store.insert("male", doc(json!({"_key": "bob"}))),
            Err(StoreError::DuplicateKey(_))
        ));
        assert_eq!(store.count("male").unwrap(), 3);
    }

    #[test]
    fn test_edge_requires_handles() {
        let store = MemoryStore::new();
        store.create_collection("relation", CollectionKind::Edge).unwrap();

        assert!(matches!(
            store.insert("relation", doc(json!({"type": "married"}))),
            Err(StoreError::InvalidDocument(_))
        ));
        assert!(matches!(
            store.insert("relation", doc(json!({"_from": "alice", "_to": "male/bob"}))),
            Err(StoreError::BadHandle(_))
        ));

        let edge = store
            .insert_edge(
                "relation",
                &DocumentId::new("female", "alice"),
                &DocumentId::new("male", "bob"),
                doc(json!({"type": "married"})),
            )
            .unwrap();
        assert_eq!(edge.edge_from(), Some("female/alice"));
        assert_eq!(edge.edge_to(), Some("male/bob"));
    }

    #[test]
    fn test_replace_update_remove() {
        let store = MemoryStore::new();
        store.create_collection("female", CollectionKind::Document).unwrap();
        store
            .insert("female", doc(json!({"_key": "alice", "name": "Alice", "age": 30})))
            .unwrap();
        let id = DocumentId::new("female", "alice");

        let updated = store.update(&id, doc(json!({"age": 31}))).unwrap();
        assert_eq!(updated.get("name"), Some(&json!("Alice")));
        assert_eq!(updated.get("age"), Some(&json!(31)));

        let replaced = store.replace(&id, doc(json!({"nick": "Al"}))).unwrap();
        assert_eq!(replaced.get("name"), None);
        assert_eq!(replaced.id(), Some("female/alice"));

        store.remove(&id).unwrap();
        assert!(!store.exists(&id));
        assert!(store.document(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_snapshot_restore() {
        let store = MemoryStore::new();
        store.create_collection("female", CollectionKind::Document).unwrap();
        store.insert("female", doc(json!({"_key": "alice"}))).unwrap();

        let names = vec!["female".to_string(), "fresh".to_string()];
        let snapshot = store.snapshot(&names).unwrap();
        store.remove(&DocumentId::new("female", "alice")).unwrap();
        store.create_collection("fresh", CollectionKind::Document).unwrap();

        store.restore(snapshot).unwrap();
        assert!(store.exists(&DocumentId::new("female", "alice")));
        assert_eq!(store.collection_kind("fresh"), None);
    }
}
