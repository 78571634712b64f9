//! Document/edge store collaborator
//!
//! The graph layer never touches storage internals. It needs:
//! - Named collections typed document or edge (create, drop, lookup)
//! - Per-document insert/replace/update/remove/lookup by id
//! - A transaction executor with an explicit write-lock set
//!
//! [`MemoryStore`] implements both traits in memory.

pub mod document;
pub mod memory;
pub mod transaction;

pub use document::{Document, DocumentId, FROM_FIELD, ID_FIELD, KEY_FIELD, TO_FIELD};
pub use memory::MemoryStore;
pub use transaction::{TransactionCollections, TransactionExecutor};

use std::fmt;
use thiserror::Error;

/// Storage kind of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    /// Plain documents (vertices)
    Document,
    /// Documents carrying `_from`/`_to` handles
    Edge,
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKind::Document => write!(f, "document"),
            CollectionKind::Edge => write!(f, "edge"),
        }
    }
}

/// Storage errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Collection does not exist
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Collection exists already
    #[error("Duplicate collection name: {0}")]
    DuplicateCollection(String),

    /// Collection has the wrong storage kind for the operation
    #[error("Collection {name} is a {actual} collection, expected {expected}")]
    WrongCollectionKind {
        name: String,
        expected: CollectionKind,
        actual: CollectionKind,
    },

    /// Document does not exist
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Key already taken in the collection
    #[error("Unique constraint violated: {0}")]
    DuplicateKey(String),

    /// Malformed `collection/key` handle
    #[error("Illegal document handle: {0}")]
    BadHandle(String),

    /// Document body is not a JSON object or misses required fields
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Write inside a transaction to a collection outside its write set
    #[error("Collection {0} was not declared for writing in this transaction")]
    CollectionNotLocked(String),

    /// Transaction action requested an abort
    #[error("Transaction aborted: {0}")]
    Aborted(String),

    /// A lock was poisoned by a panicking writer
    #[error("Store lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    /// Whether this error reports a missing collection or document
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::CollectionNotFound(_) | StoreError::DocumentNotFound(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Document/edge store
///
/// All methods take `&self`; implementations handle their own locking.
pub trait DocumentStore: Send + Sync {
    /// Storage kind of a collection, or None if it does not exist
    fn collection_kind(&self, name: &str) -> Option<CollectionKind>;

    /// Create an empty collection
    fn create_collection(&self, name: &str, kind: CollectionKind) -> StoreResult<()>;

    /// Drop a collection and all of its documents
    fn drop_collection(&self, name: &str) -> StoreResult<()>;

    /// Names of all collections
    fn collection_names(&self) -> Vec<String>;

    /// Insert a document; `_key` is generated when absent
    ///
    /// Edge collections require valid `_from`/`_to` handles.
    fn insert(&self, collection: &str, document: Document) -> StoreResult<Document>;

    /// Look up a document by id
    fn document(&self, id: &DocumentId) -> StoreResult<Document>;

    /// Replace a document's body, keeping its system attributes
    fn replace(&self, id: &DocumentId, document: Document) -> StoreResult<Document>;

    /// Merge attributes into a document
    fn update(&self, id: &DocumentId, patch: Document) -> StoreResult<Document>;

    /// Remove a document
    fn remove(&self, id: &DocumentId) -> StoreResult<()>;

    /// All documents of a collection
    fn all(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Whether a document exists
    fn exists(&self, id: &DocumentId) -> bool {
        self.document(id).is_ok()
    }

    /// Number of documents in a collection
    fn count(&self, collection: &str) -> StoreResult<usize> {
        Ok(self.all(collection)?.len())
    }

    /// Insert an edge document between two handles
    fn insert_edge(
        &self,
        collection: &str,
        from: &DocumentId,
        to: &DocumentId,
        mut data: Document,
    ) -> StoreResult<Document> {
        data.set(FROM_FIELD, from.to_string());
        data.set(TO_FIELD, to.to_string());
        self.insert(collection, data)
    }
}
