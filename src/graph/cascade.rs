//! Cascading delete
//!
//! Removing a vertex or an edge removes every edge that transitively points
//! at it, across all graphs sharing the affected collections:
//! 1. Seed the pending set with the target and its collection as lock
//! 2. For every edge collection whose relation lists the collection of a
//!    pending id in from/to, collect edges with `_from` or `_to` equal to it
//! 3. Every new edge is pending too and expanded the same way
//! 4. Remove all pending ids in one transaction locking every collection seen

use super::error::{GraphError, GraphResult};
use super::index::RelationIndex;
use crate::store::{
    Document, DocumentId, DocumentStore, StoreError, TransactionCollections, TransactionExecutor,
};
use indexmap::IndexSet;
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::debug;

/// Ids to remove (discovery order) and the collections to lock
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovalPlan {
    pub ids: IndexSet<DocumentId>,
    pub locks: BTreeSet<String>,
}

impl RemovalPlan {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub(crate) struct CascadingDelete<'a> {
    store: &'a dyn DocumentStore,
    index: &'a RelationIndex,
    limit: Option<usize>,
}

impl<'a> CascadingDelete<'a> {
    pub fn new(store: &'a dyn DocumentStore, index: &'a RelationIndex, limit: Option<usize>) -> Self {
        Self { store, index, limit }
    }

    /// Collect the target and its transitive edge closure
    pub fn plan(&self, target: &DocumentId) -> GraphResult<RemovalPlan> {
        // fail before any work if the target is absent
        self.store.document(target)?;

        let mut plan = RemovalPlan::default();
        plan.ids.insert(target.clone());
        plan.locks.insert(target.collection().to_string());

        let mut edge_cache: HashMap<String, Vec<Document>> = HashMap::new();
        let mut queue = VecDeque::from([target.clone()]);

        while let Some(current) = queue.pop_front() {
            let handle = current.to_string();
            for edge_collection in self.index.referencing_edge_collections(current.collection()) {
                if !edge_cache.contains_key(&edge_collection) {
                    let edges = match self.store.all(&edge_collection) {
                        Ok(edges) => edges,
                        Err(StoreError::CollectionNotFound(_)) => Vec::new(),
                        Err(e) => return Err(e.into()),
                    };
                    edge_cache.insert(edge_collection.clone(), edges);
                }

                for edge in edge_cache[&edge_collection].iter().filter(|e| e.touches(&handle)) {
                    let id = edge.handle()?;
                    if plan.ids.insert(id.clone()) {
                        if let Some(limit) = self.limit {
                            if plan.ids.len() > limit {
                                return Err(GraphError::CascadeLimitExceeded {
                                    target: target.to_string(),
                                    limit,
                                });
                            }
                        }
                        plan.locks.insert(edge_collection.clone());
                        queue.push_back(id);
                    }
                }
            }
        }

        debug!(
            "Cascade for {} collected {} documents in {:?}",
            target,
            plan.len(),
            plan.locks
        );
        Ok(plan)
    }

    /// Remove every planned id in one transaction, dependents first
    pub fn execute(
        &self,
        transactions: &dyn TransactionExecutor,
        plan: &RemovalPlan,
    ) -> GraphResult<usize> {
        let collections = TransactionCollections {
            write: plan.locks.clone(),
        };
        transactions.execute_transaction(&collections, &mut |tx| {
            for id in plan.ids.iter().rev() {
                tx.remove(id)?;
            }
            Ok(())
        })?;
        Ok(plan.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::definition::GraphDefinition;
    use crate::graph::relation::RelationDefinition;
    use crate::store::{CollectionKind, MemoryStore};
    use serde_json::json;

    fn setup() -> (MemoryStore, RelationIndex) {
        let store = MemoryStore::new();
        for (name, kind) in [
            ("female", CollectionKind::Document),
            ("male", CollectionKind::Document),
            ("relation", CollectionKind::Edge),
            ("flags", CollectionKind::Edge),
        ] {
            store.create_collection(name, kind).unwrap();
        }
        let insert = |collection: &str, value: serde_json::Value| {
            store
                .insert(collection, Document::from_value(value).unwrap())
                .unwrap();
        };
        insert("female", json!({"_key": "alice"}));
        insert("male", json!({"_key": "bob"}));
        insert("male", json!({"_key": "charly"}));
        insert("relation", json!({"_key": "ab", "_from": "female/alice", "_to": "male/bob"}));
        insert("relation", json!({"_key": "bc", "_from": "male/bob", "_to": "male/charly"}));
        insert("flags", json!({"_key": "f1", "_from": "relation/ab", "_to": "male/charly"}));

        let index = RelationIndex::build(&[
            GraphDefinition::new(
                "social",
                vec![RelationDefinition::new("relation", ["female", "male"], ["female", "male"])],
                vec![],
            ),
            GraphDefinition::new(
                "moderation",
                vec![RelationDefinition::new("flags", "relation", "male")],
                vec![],
            ),
        ]);
        (store, index)
    }

    #[test]
    fn test_plan_follows_edges_on_edges() {
        let (store, index) = setup();
        let cascade = CascadingDelete::new(&store, &index, None);

        let plan = cascade.plan(&DocumentId::new("female", "alice")).unwrap();
        let ids: Vec<String> = plan.ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["female/alice", "relation/ab", "flags/f1"]);
        assert_eq!(
            plan.locks.iter().cloned().collect::<Vec<_>>(),
            vec!["female", "flags", "relation"]
        );
    }

    #[test]
    fn test_execute_removes_closure() {
        let (store, index) = setup();
        let cascade = CascadingDelete::new(&store, &index, None);
        let plan = cascade.plan(&DocumentId::new("male", "bob")).unwrap();
        assert_eq!(cascade.execute(&store, &plan).unwrap(), 4);

        assert_eq!(store.count("relation").unwrap(), 0);
        assert_eq!(store.count("flags").unwrap(), 0);
        assert!(store.exists(&DocumentId::new("female", "alice")));
        assert!(store.exists(&DocumentId::new("male", "charly")));
    }

    #[test]
    fn test_missing_target_and_limit() {
        let (store, index) = setup();
        let cascade = CascadingDelete::new(&store, &index, None);
        assert!(cascade
            .plan(&DocumentId::new("female", "nobody"))
            .unwrap_err()
            .is_not_found());

        let bounded = CascadingDelete::new(&store, &index, Some(2));
        assert!(matches!(
            bounded.plan(&DocumentId::new("male", "bob")),
            Err(GraphError::CascadeLimitExceeded { limit: 2, .. })
        ));
    }
}
