//! Graph definitions persisted in the meta collection

use super::definition::GraphDefinition;
use super::error::{GraphError, GraphResult};
use super::index::RelationIndex;
use crate::database::Database;
use crate::store::{CollectionKind, DocumentId, StoreError};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Reads and writes graph definitions; caches the cross-graph relation index
///
/// The cache is keyed on the persisted definitions themselves, so writes made
/// by other catalogs on the same store (or straight into the meta
/// collection) invalidate it as well.
pub(crate) struct Catalog {
    db: Database,
    collection: String,
    index: Mutex<Option<(Vec<GraphDefinition>, Arc<RelationIndex>)>>,
}

impl Catalog {
    /// Open the catalog, creating the meta collection if missing
    pub fn open(db: Database, collection: impl Into<String>) -> GraphResult<Self> {
        let collection = collection.into();
        match db.store().collection_kind(&collection) {
            Some(CollectionKind::Document) => {}
            Some(CollectionKind::Edge) => return Err(GraphError::NotACollection(collection)),
            None => {
                db.store()
                    .create_collection(&collection, CollectionKind::Document)?;
                debug!("Created graph meta collection {}", collection);
            }
        }
        Ok(Self {
            db,
            collection,
            index: Mutex::new(None),
        })
    }

    fn id(&self, name: &str) -> DocumentId {
        DocumentId::new(&self.collection, name)
    }

    pub fn exists(&self, name: &str) -> bool {
        !name.is_empty() && self.db.store().exists(&self.id(name))
    }

    pub fn get(&self, name: &str) -> GraphResult<GraphDefinition> {
        if name.is_empty() {
            return Err(GraphError::MissingName);
        }
        match self.db.store().document(&self.id(name)) {
            Ok(document) => GraphDefinition::from_document(document),
            Err(e) if e.is_not_found() => Err(GraphError::GraphNotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Every persisted definition, in insertion order
    pub fn all(&self) -> GraphResult<Vec<GraphDefinition>> {
        self.db
            .store()
            .all(&self.collection)?
            .into_iter()
            .map(GraphDefinition::from_document)
            .collect()
    }

    pub fn insert(&self, definition: &GraphDefinition) -> GraphResult<()> {
        let result = self
            .db
            .store()
            .insert(&self.collection, definition.to_document()?);
        match result {
            Ok(_) => Ok(()),
            Err(StoreError::DuplicateKey(_)) => {
                Err(GraphError::DuplicateGraph(definition.name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, definition: &GraphDefinition) -> GraphResult<()> {
        let result = self
            .db
            .store()
            .replace(&self.id(&definition.name), definition.to_document()?);
        result.map(|_| ()).map_err(|e| {
            if e.is_not_found() {
                GraphError::GraphNotFound(definition.name.clone())
            } else {
                e.into()
            }
        })
    }

    pub fn remove(&self, name: &str) -> GraphResult<()> {
        let result = self.db.store().remove(&self.id(name));
        result.map_err(|e| {
            if e.is_not_found() {
                GraphError::GraphNotFound(name.to_string())
            } else {
                e.into()
            }
        })
    }

    /// Relation index over every persisted graph
    ///
    /// Reused only while the persisted definitions equal the ones it was
    /// built from.
    pub fn relation_index(&self) -> GraphResult<Arc<RelationIndex>> {
        let definitions = self.all()?;
        let mut cached = self
            .index
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        if let Some((built_from, index)) = cached.as_ref() {
            if *built_from == definitions {
                return Ok(index.clone());
            }
        }

        let index = Arc::new(RelationIndex::build(&definitions));
        debug!("Rebuilt relation index over {} graphs", definitions.len());
        *cached = Some((definitions, index.clone()));
        Ok(index)
    }
}
