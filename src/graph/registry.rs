//! Graph lifecycle: create, load, list and drop named graphs

use super::catalog::Catalog;
use super::definition::GraphDefinition;
use super::error::{GraphError, GraphResult};
use super::handle::GraphHandle;
use super::provision::{CollectionProvisioner, ProvisionMode};
use super::relation::RelationDefinition;
use crate::config::GraphConfig;
use crate::database::Database;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entry point of the graph layer
///
/// Clones share one catalog, so the cached relation index sees every write
/// made through any of them.
#[derive(Clone)]
pub struct GraphRegistry {
    db: Database,
    config: Arc<GraphConfig>,
    catalog: Arc<Catalog>,
}

impl GraphRegistry {
    /// Registry with default configuration
    pub fn new(db: Database) -> GraphResult<Self> {
        Self::with_config(db, GraphConfig::default())
    }

    pub fn with_config(db: Database, config: GraphConfig) -> GraphResult<Self> {
        let catalog = Catalog::open(db.clone(), config.graphs_collection.clone())?;
        Ok(Self {
            db,
            config: Arc::new(config),
            catalog: Arc::new(catalog),
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    fn handle(&self, definition: GraphDefinition) -> GraphHandle {
        GraphHandle::new(
            self.db.clone(),
            self.config.clone(),
            self.catalog.clone(),
            definition,
        )
    }

    /// Create and persist a graph, provisioning missing collections
    ///
    /// All checks run before anything is created: a failing call leaves
    /// neither collections nor a definition behind.
    pub fn create(
        &self,
        name: &str,
        edge_definitions: Vec<RelationDefinition>,
        orphan_collections: Vec<String>,
    ) -> GraphResult<GraphHandle> {
        if name.is_empty() {
            return Err(GraphError::MissingName);
        }

        let mut seen = BTreeSet::new();
        let mut relations = Vec::with_capacity(edge_definitions.len());
        for relation in edge_definitions {
            let relation = relation.normalized();
            relation.validate()?;
            if !seen.insert(relation.collection.clone()) {
                return Err(GraphError::CollectionMultiUse(relation.collection));
            }
            relations.push(relation);
        }

        if self.catalog.exists(name) {
            return Err(GraphError::DuplicateGraph(name.to_string()));
        }

        let index = self.catalog.relation_index()?;
        for relation in &relations {
            index.check_compatible(relation)?;
        }

        let mut orphans = orphan_collections;
        orphans.sort();
        orphans.dedup();
        let definition = GraphDefinition::new(name, relations, orphans);
        definition.validate()?;

        CollectionProvisioner::new(self.db.store(), ProvisionMode::CreateMissing)
            .provision(&definition.edge_definitions, &definition.orphan_collections)?;
        self.catalog.insert(&definition)?;

        info!("Created graph {}", definition);
        Ok(self.handle(definition))
    }

    /// Load a persisted graph
    ///
    /// Fails with `NotACollection` if a collection it names was dropped or
    /// changed kind behind the graph's back.
    pub fn graph(&self, name: &str) -> GraphResult<GraphHandle> {
        let definition = self.catalog.get(name)?;
        CollectionProvisioner::new(self.db.store(), ProvisionMode::LookupOnly)
            .provision(&definition.edge_definitions, &definition.orphan_collections)?;
        debug!("Loaded graph {}", name);
        Ok(self.handle(definition))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.catalog.exists(name)
    }

    /// Names of every persisted graph
    pub fn list(&self) -> GraphResult<Vec<String>> {
        Ok(self
            .catalog
            .all()?
            .into_iter()
            .map(|definition| definition.name)
            .collect())
    }

    pub fn list_definitions(&self) -> GraphResult<Vec<GraphDefinition>> {
        self.catalog.all()
    }

    /// Remove a graph definition
    ///
    /// With `drop_collections`, its collections are dropped too, except those
    /// another graph still uses.
    pub fn drop_graph(&self, name: &str, drop_collections: bool) -> GraphResult<()> {
        let definition = self.catalog.get(name)?;
        self.catalog.remove(name)?;

        if drop_collections {
            let remaining = self.catalog.all()?;
            for collection in definition.collection_names() {
                if remaining.iter().any(|other| other.references(&collection)) {
                    debug!("Keeping {}: still used by another graph", collection);
                    continue;
                }
                if let Err(e) = self.db.store().drop_collection(&collection) {
                    warn!("Failed to drop collection {} of graph {}: {}", collection, name, e);
                }
            }
        }

        info!("Dropped graph {}", name);
        Ok(())
    }
}
