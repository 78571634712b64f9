//! Find-or-create collections named by relations and orphan lists

use super::error::{GraphError, GraphResult};
use super::relation::RelationDefinition;
use crate::store::{CollectionKind, DocumentStore};
use tracing::debug;

/// Whether missing collections get created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProvisionMode {
    CreateMissing,
    LookupOnly,
}

pub(crate) struct CollectionProvisioner<'a> {
    store: &'a dyn DocumentStore,
    mode: ProvisionMode,
}

impl<'a> CollectionProvisioner<'a> {
    pub fn new(store: &'a dyn DocumentStore, mode: ProvisionMode) -> Self {
        Self { store, mode }
    }

    /// Check every collection first, then create the missing ones
    pub fn provision(
        &self,
        relations: &[RelationDefinition],
        orphans: &[String],
    ) -> GraphResult<()> {
        let mut wanted: Vec<(&str, CollectionKind)> = Vec::new();
        for relation in relations {
            for vertex_collection in relation.from.iter().chain(&relation.to) {
                wanted.push((vertex_collection.as_str(), CollectionKind::Document));
            }
            wanted.push((relation.collection.as_str(), CollectionKind::Edge));
        }
        wanted.extend(orphans.iter().map(|o| (o.as_str(), CollectionKind::Document)));

        let mut missing = Vec::new();
        for (name, kind) in wanted {
            match (self.store.collection_kind(name), kind) {
                (None, _) => {
                    if self.mode == ProvisionMode::LookupOnly {
                        return Err(GraphError::NotACollection(name.to_string()));
                    }
                    match missing.iter_mut().find(|(m, _)| *m == name) {
                        // a collection needed both ways is created as edge collection
                        Some(entry) if kind == CollectionKind::Edge => entry.1 = kind,
                        Some(_) => {}
                        None => missing.push((name, kind)),
                    }
                }
                // edge collections may serve as vertex collections
                (Some(_), CollectionKind::Document) => {}
                (Some(CollectionKind::Edge), CollectionKind::Edge) => {}
                (Some(CollectionKind::Document), CollectionKind::Edge) => {
                    return Err(GraphError::NotACollection(name.to_string()));
                }
            }
        }

        for (name, kind) in missing {
            self.store.create_collection(name, kind)?;
            debug!("Provisioned {} collection {}", kind, name);
        }
        Ok(())
    }
}
