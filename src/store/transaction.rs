//! Transactions with an explicit write-lock set
//!
//! An action runs against a [`DocumentStore`] view that only permits writes
//! to the declared collections. When the action returns an error every
//! declared collection is restored and the error is handed back unchanged.

use super::document::{Document, DocumentId};
use super::memory::MemoryStore;
use super::{CollectionKind, DocumentStore, StoreError, StoreResult};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Collections a transaction declares up front
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionCollections {
    /// Collections the action may write to
    pub write: BTreeSet<String>,
}

impl TransactionCollections {
    /// Declare a write set
    pub fn write<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            write: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Runs an action atomically
pub trait TransactionExecutor: Send + Sync {
    /// Execute `action`; if it fails, none of its writes are visible
    fn execute_transaction(
        &self,
        collections: &TransactionCollections,
        action: &mut dyn FnMut(&dyn DocumentStore) -> StoreResult<()>,
    ) -> StoreResult<()>;
}

impl TransactionExecutor for MemoryStore {
    fn execute_transaction(
        &self,
        collections: &TransactionCollections,
        action: &mut dyn FnMut(&dyn DocumentStore) -> StoreResult<()>,
    ) -> StoreResult<()> {
        let _guard = self.begin()?;
        let names: Vec<String> = collections.write.iter().cloned().collect();
        let snapshot = self.snapshot(&names)?;
        debug!("Transaction started, write set {:?}", names);

        let scope = TransactionScope {
            store: self,
            write: &collections.write,
        };
        match action(&scope) {
            Ok(()) => {
                debug!("Transaction committed");
                Ok(())
            }
            Err(e) => {
                warn!("Transaction aborted, rolling back: {}", e);
                self.restore(snapshot)?;
                Err(e)
            }
        }
    }
}

/// Store view handed to a transaction action
struct TransactionScope<'a> {
    store: &'a MemoryStore,
    write: &'a BTreeSet<String>,
}

impl TransactionScope<'_> {
    fn check(&self, collection: &str) -> StoreResult<()> {
        if self.write.contains(collection) {
            Ok(())
        } else {
            Err(StoreError::CollectionNotLocked(collection.to_string()))
        }
    }
}

impl DocumentStore for TransactionScope<'_> {
    fn collection_kind(&self, name: &str) -> Option<CollectionKind> {
        self.store.collection_kind(name)
    }

    fn create_collection(&self, name: &str, kind: CollectionKind) -> StoreResult<()> {
        self.check(name)?;
        self.store.create_collection(name, kind)
    }

    fn drop_collection(&self, name: &str) -> StoreResult<()> {
        self.check(name)?;
        self.store.drop_collection(name)
    }

    fn collection_names(&self) -> Vec<String> {
        self.store.collection_names()
    }

    fn insert(&self, collection: &str, document: Document) -> StoreResult<Document> {
        self.check(collection)?;
        self.store.insert(collection, document)
    }

    fn document(&self, id: &DocumentId) -> StoreResult<Document> {
        self.store.document(id)
    }

    fn replace(&self, id: &DocumentId, document: Document) -> StoreResult<Document> {
        self.check(id.collection())?;
        self.store.replace(id, document)
    }

    fn update(&self, id: &DocumentId, patch: Document) -> StoreResult<Document> {
        self.check(id.collection())?;
        self.store.update(id, patch)
    }

    fn remove(&self, id: &DocumentId) -> StoreResult<()> {
        self.check(id.collection())?;
        self.store.remove(id)
    }

    fn all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.store.all(collection)
    }

    fn count(&self, collection: &str) -> StoreResult<usize> {
        self.store.count(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_collection("female", CollectionKind::Document).unwrap();
        store.create_collection("relation", CollectionKind::Edge).unwrap();
        store
            .insert("female", Document::from_value(json!({"_key": "alice"})).unwrap())
            .unwrap();
        store
            .insert(
                "relation",
                Document::from_value(json!({
                    "_key": "e1", "_from": "female/alice", "_to": "female/alice"
                }))
                .unwrap(),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_commit() {
        let store = setup();
        let collections = TransactionCollections::write(["female", "relation"]);
        store
            .execute_transaction(&collections, &mut |tx| {
                tx.remove(&DocumentId::new("relation", "e1"))?;
                tx.remove(&DocumentId::new("female", "alice"))
            })
            .unwrap();

        assert_eq!(store.count("female").unwrap(), 0);
        assert_eq!(store.count("relation").unwrap(), 0);
    }

    #[test]
    fn test_rollback_on_error() {
        let store = setup();
        let collections = TransactionCollections::write(["female", "relation"]);
        let err = store
            .execute_transaction(&collections, &mut |tx| {
                tx.remove(&DocumentId::new("relation", "e1"))?;
                tx.remove(&DocumentId::new("female", "alice"))?;
                Err(StoreError::Aborted("forced".into()))
            })
            .unwrap_err();

        assert_eq!(err, StoreError::Aborted("forced".into()));
        assert!(store.exists(&DocumentId::new("female", "alice")));
        assert!(store.exists(&DocumentId::new("relation", "e1")));
    }

    #[test]
    fn test_undeclared_write_rejected() {
        let store = setup();
        let collections = TransactionCollections::write(["relation"]);
        let err = store
            .execute_transaction(&collections, &mut |tx| {
                tx.remove(&DocumentId::new("relation", "e1"))?;
                tx.remove(&DocumentId::new("female", "alice"))
            })
            .unwrap_err();

        assert_eq!(err, StoreError::CollectionNotLocked("female".into()));
        assert!(store.exists(&DocumentId::new("relation", "e1")));
    }
}
