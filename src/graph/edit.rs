//! Structural edits of a loaded graph
//!
//! Every edit reads the latest persisted definition, checks it against all
//! other graphs, provisions missing collections and only then writes. The
//! handle is rebound to the saved definition afterwards.

use super::definition::GraphDefinition;
use super::error::{GraphError, GraphResult};
use super::handle::GraphHandle;
use super::provision::{CollectionProvisioner, ProvisionMode};
use super::relation::RelationDefinition;
use crate::store::CollectionKind;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

impl GraphHandle {
    fn current(&self) -> GraphResult<GraphDefinition> {
        self.catalog().get(self.name())
    }

    fn provision(&self, relation: &RelationDefinition) -> GraphResult<()> {
        CollectionProvisioner::new(self.db().store(), ProvisionMode::CreateMissing)
            .provision(std::slice::from_ref(relation), &[])
    }

    fn save(&mut self, definition: GraphDefinition) -> GraphResult<()> {
        self.catalog().save(&definition)?;
        self.rebind(definition);
        Ok(())
    }

    /// Drop `collection` unless some persisted graph still uses it
    fn drop_if_unused(&self, collection: &str) -> GraphResult<()> {
        if self
            .catalog()
            .all()?
            .iter()
            .any(|graph| graph.references(collection))
        {
            debug!("Keeping {}: still used by a graph", collection);
            return Ok(());
        }
        if let Err(e) = self.db().store().drop_collection(collection) {
            warn!("Failed to drop collection {}: {}", collection, e);
        }
        Ok(())
    }

    /// Add a relation to this graph
    ///
    /// Orphans the relation now uses stop being orphans.
    pub fn extend_edge_definitions(&mut self, relation: RelationDefinition) -> GraphResult<()> {
        let relation = relation.normalized();
        relation.validate()?;

        let mut definition = self.current()?;
        if definition.relation(&relation.collection).is_some() {
            return Err(GraphError::CollectionMultiUse(relation.collection));
        }
        self.catalog().relation_index()?.check_compatible(&relation)?;
        self.provision(&relation)?;

        info!("Graph {}: adding relation {}", definition.name, relation);
        definition.edge_definitions.push(relation);
        definition.reconcile_orphans(&BTreeSet::new());
        self.save(definition)
    }

    /// Replace the from/to sets of an edge collection this graph declares
    ///
    /// The change applies to every graph declaring the same edge collection.
    /// Vertex collections a graph no longer uses become its orphans.
    pub fn edit_edge_definitions(&mut self, relation: RelationDefinition) -> GraphResult<()> {
        let relation = relation.normalized();
        relation.validate()?;

        let current = self.current()?;
        if current.relation(&relation.collection).is_none() {
            return Err(GraphError::EdgeCollectionNotUsed(relation.collection));
        }
        self.provision(&relation)?;

        let index = self.catalog().relation_index()?;
        let mut originals = vec![current];
        for name in index.graphs_declaring(&relation.collection) {
            if name != originals[0].name {
                originals.push(self.catalog().get(&name)?);
            }
        }

        let mut updated = originals.clone();
        for definition in updated.iter_mut() {
            if let Some(existing) = definition.relation_mut(&relation.collection) {
                let released = existing.vertex_collections();
                *existing = relation.clone();
                definition.reconcile_orphans(&released);
            }
        }

        // this graph first; a failed save restores the ones already written
        for (position, definition) in updated.iter().enumerate() {
            if let Err(e) = self.catalog().save(definition) {
                warn!("Graph {}: edit of {} failed: {}", definition.name, relation.collection, e);
                for original in &originals[..position] {
                    if let Err(undo) = self.catalog().save(original) {
                        warn!("Graph {}: restore failed: {}", original.name, undo);
                    }
                }
                return Err(e);
            }
            debug!("Graph {}: relation {} follows edit", definition.name, relation.collection);
        }

        info!("Graph {}: edited relation {}", self.name(), relation);
        let own = updated.swap_remove(0);
        self.rebind(own);
        Ok(())
    }

    /// Remove a relation from this graph
    ///
    /// Its vertex collections become orphans unless another relation of the
    /// graph still uses them. With `drop_collection`, the edge collection is
    /// dropped if no graph uses it any more.
    pub fn delete_edge_definition(&mut self, edge_collection: &str, drop_collection: bool) -> GraphResult<()> {
        let mut definition = self.current()?;
        let position = definition
            .edge_definitions
            .iter()
            .position(|r| r.collection == edge_collection)
            .ok_or_else(|| GraphError::EdgeCollectionNotUsed(edge_collection.to_string()))?;

        let removed = definition.edge_definitions.remove(position);
        definition.reconcile_orphans(&removed.vertex_collections());
        info!("Graph {}: removed relation {}", definition.name, removed);
        self.save(definition)?;

        if drop_collection {
            self.drop_if_unused(edge_collection)?;
        }
        Ok(())
    }

    /// Add an orphan vertex collection
    ///
    /// A missing collection is created only when `create` is set.
    pub fn add_vertex_collection(&mut self, name: &str, create: bool) -> GraphResult<()> {
        let store = self.db().store();
        match store.collection_kind(name) {
            None if !create => {
                return Err(GraphError::VertexCollectionDoesNotExist(name.to_string()))
            }
            Some(CollectionKind::Edge) => {
                return Err(GraphError::WrongCollectionTypeVertex(name.to_string()))
            }
            _ => {}
        }

        let mut definition = self.current()?;
        if definition.relation_vertex_collections().contains(name) {
            return Err(GraphError::CollectionUsedInEdgeDefinition(name.to_string()));
        }
        if definition.orphan_collections.iter().any(|o| o == name) {
            return Err(GraphError::CollectionUsedInOrphans(name.to_string()));
        }

        if store.collection_kind(name).is_none() {
            store.create_collection(name, CollectionKind::Document)?;
        }
        definition.orphan_collections.push(name.to_string());
        definition.orphan_collections.sort();
        definition.validate()?;
        info!("Graph {}: added orphan collection {}", definition.name, name);
        self.save(definition)
    }

    /// Remove an orphan vertex collection
    ///
    /// With `drop_collection`, the collection is dropped if no graph uses it
    /// any more.
    pub fn remove_vertex_collection(&mut self, name: &str, drop_collection: bool) -> GraphResult<()> {
        let mut definition = self.current()?;
        let position = definition
            .orphan_collections
            .iter()
            .position(|o| o == name)
            .ok_or_else(|| GraphError::NotInOrphanCollection(name.to_string()))?;

        definition.orphan_collections.remove(position);
        info!("Graph {}: removed orphan collection {}", definition.name, name);
        self.save(definition)?;

        if drop_collection {
            self.drop_if_unused(name)?;
        }
        Ok(())
    }
}
