//! Collaborator bundle handed to the graph layer

use crate::config::GraphConfig;
use crate::query::{MemoryQueryEngine, QueryEngine};
use crate::store::{DocumentStore, MemoryStore, TransactionExecutor};
use std::fmt;
use std::sync::Arc;

/// Store, transaction executor and query engine of one database
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    transactions: Arc<dyn TransactionExecutor>,
    queries: Arc<dyn QueryEngine>,
}

impl Database {
    /// Bundle externally provided collaborators
    pub fn new(
        store: Arc<dyn DocumentStore>,
        transactions: Arc<dyn TransactionExecutor>,
        queries: Arc<dyn QueryEngine>,
    ) -> Self {
        Self {
            store,
            transactions,
            queries,
        }
    }

    /// Fresh in-memory database with default configuration
    pub fn in_memory() -> Self {
        Self::in_memory_with(&GraphConfig::default())
    }

    /// Fresh in-memory database whose query engine reads graph definitions
    /// from `config.graphs_collection`
    pub fn in_memory_with(config: &GraphConfig) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();
        let queries = MemoryQueryEngine::with_graphs_collection(
            store.clone(),
            config.graphs_collection.clone(),
        );
        Self::new(store, memory, Arc::new(queries))
    }

    /// Replace the transaction executor, keeping store and query engine
    pub fn with_transactions(mut self, transactions: Arc<dyn TransactionExecutor>) -> Self {
        self.transactions = transactions;
        self
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn transactions(&self) -> &dyn TransactionExecutor {
        self.transactions.as_ref()
    }

    pub fn queries(&self) -> &dyn QueryEngine {
        self.queries.as_ref()
    }

    pub fn store_handle(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("collections", &self.store.collection_names())
            .finish()
    }
}
