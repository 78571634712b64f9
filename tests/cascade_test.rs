//! Cascading delete across graphs and under failing transactions

use gharial::*;
use serde_json::json;
use std::sync::Arc;

/// Runs the action, then aborts the transaction anyway
struct AbortingExecutor {
    inner: Arc<MemoryStore>,
}

impl TransactionExecutor for AbortingExecutor {
    fn execute_transaction(
        &self,
        collections: &TransactionCollections,
        action: &mut dyn FnMut(&dyn DocumentStore) -> StoreResult<()>,
    ) -> StoreResult<()> {
        self.inner.execute_transaction(collections, &mut |tx| {
            action(tx)?;
            Err(StoreError::Aborted("forced failure".to_string()))
        })
    }
}

fn aborting_database() -> Database {
    let memory = Arc::new(MemoryStore::new());
    let store: Arc<dyn DocumentStore> = memory.clone();
    let queries = Arc::new(MemoryQueryEngine::new(store.clone()));
    Database::new(store, Arc::new(AbortingExecutor { inner: memory }), queries)
}

fn populate(graph: &GraphHandle) {
    graph
        .vertex_collection("female")
        .unwrap()
        .insert(json!({"_key": "alice", "name": "Alice"}))
        .unwrap();
    graph
        .vertex_collection("male")
        .unwrap()
        .insert(json!({"_key": "bob", "name": "Bob"}))
        .unwrap();
    graph
        .edge_collection("relation")
        .unwrap()
        .insert(
            "female/alice",
            "male/bob",
            json!({"_key": "aliceAndBob", "type": "married"}),
        )
        .unwrap();
}

fn dump(store: &dyn DocumentStore, collections: &[&str]) -> String {
    let all: Vec<Vec<Document>> = collections
        .iter()
        .map(|c| store.all(c).unwrap())
        .collect();
    serde_json::to_string(&all).unwrap()
}

#[test]
fn test_failed_transaction_leaves_store_untouched() {
    let registry = GraphRegistry::new(aborting_database()).unwrap();
    let relation = directed_relation("relation", ["female", "male"], ["female", "male"]).unwrap();
    let graph = registry.create("social", vec![relation], vec![]).unwrap();
    populate(&graph);

    let store = registry.database().store();
    let collections = ["female", "male", "relation"];
    let before = dump(store, &collections);

    let err = graph
        .vertex_collection("female")
        .unwrap()
        .remove("alice")
        .unwrap_err();
    assert!(matches!(err, GraphError::Store(StoreError::Aborted(_))));

    assert_eq!(dump(store, &collections), before);
    assert!(graph.vertex_collection("female").unwrap().exists("alice"));
    assert!(graph.edge_collection("relation").unwrap().exists("aliceAndBob"));

    // a later insert still gets a fresh key
    let edge = graph
        .edge_collection("relation")
        .unwrap()
        .insert("male/bob", "female/alice", json!({}))
        .unwrap();
    assert_ne!(edge.key(), Some("aliceAndBob"));
}

#[test]
fn test_cascade_reaches_other_graphs() {
    let registry = GraphRegistry::new(Database::in_memory()).unwrap();
    let social = registry
        .create(
            "social",
            vec![directed_relation("relation", ["female", "male"], ["female", "male"]).unwrap()],
            vec![],
        )
        .unwrap();
    populate(&social);

    // a second graph shares `male` and flags marriages
    let moderation = registry
        .create(
            "moderation",
            vec![
                directed_relation("reviews", "moderators", "male").unwrap(),
                directed_relation("flags", "relation", "moderators").unwrap(),
            ],
            vec![],
        )
        .unwrap();
    moderation
        .vertex_collection("moderators")
        .unwrap()
        .insert(json!({"_key": "mod"}))
        .unwrap();
    moderation
        .edge_collection("reviews")
        .unwrap()
        .insert("moderators/mod", "male/bob", json!({}))
        .unwrap();
    moderation
        .edge_collection("flags")
        .unwrap()
        .insert("relation/aliceAndBob", "moderators/mod", json!({}))
        .unwrap();

    // removing bob via `social` also removes edges only `moderation` knows
    let removed = social
        .vertex_collection("male")
        .unwrap()
        .remove("bob")
        .unwrap();
    assert_eq!(removed, 4);

    let store = registry.database().store();
    assert_eq!(store.count("relation").unwrap(), 0);
    assert_eq!(store.count("reviews").unwrap(), 0);
    assert_eq!(store.count("flags").unwrap(), 0);
    assert_eq!(store.count("moderators").unwrap(), 1);
    assert_eq!(store.count("female").unwrap(), 1);
}

#[test]
fn test_cascade_limit() {
    let config = GraphConfig::default().with_max_cascade_size(2);
    let registry = GraphRegistry::with_config(Database::in_memory_with(&config), config).unwrap();
    let graph = registry
        .create(
            "social",
            vec![directed_relation("relation", ["female", "male"], ["female", "male"]).unwrap()],
            vec![],
        )
        .unwrap();
    populate(&graph);
    graph
        .edge_collection("relation")
        .unwrap()
        .insert("male/bob", "female/alice", json!({}))
        .unwrap();

    let err = graph
        .vertex_collection("female")
        .unwrap()
        .remove("alice")
        .unwrap_err();
    assert!(matches!(err, GraphError::CascadeLimitExceeded { limit: 2, .. }));
    assert_eq!(registry.database().store().count("relation").unwrap(), 2);

    // within the bound the removal goes through
    assert_eq!(
        graph
            .edge_collection("relation")
            .unwrap()
            .remove("aliceAndBob")
            .unwrap(),
        1
    );
}

#[test]
fn test_remove_missing_document() {
    let registry = GraphRegistry::new(Database::in_memory()).unwrap();
    let graph = registry
        .create(
            "social",
            vec![directed_relation("relation", "female", "male").unwrap()],
            vec![],
        )
        .unwrap();
    let female = graph.vertex_collection("female").unwrap();
    assert!(female.remove("nobody").unwrap_err().is_not_found());
    assert!(matches!(
        female.remove("male/bob"),
        Err(GraphError::BadDocumentHandle(_))
    ));
}

#[test]
fn test_cascade_sees_graphs_of_another_registry() {
    let db = Database::in_memory();
    let first = GraphRegistry::new(db.clone()).unwrap();
    let second = GraphRegistry::new(db.clone()).unwrap();
    first
        .create(
            "social",
            vec![directed_relation("relation", ["female", "male"], ["female", "male"]).unwrap()],
            vec![],
        )
        .unwrap();

    let social = second.graph("social").unwrap();
    populate(&social);
    let male = social.vertex_collection("male").unwrap();
    male.insert(json!({"_key": "carl"})).unwrap();
    // builds the second registry's relation index
    assert_eq!(male.remove("carl").unwrap(), 1);

    let likes = first
        .create(
            "likes",
            vec![directed_relation("likes", "male", "female").unwrap()],
            vec![],
        )
        .unwrap();
    likes
        .edge_collection("likes")
        .unwrap()
        .insert("male/bob", "female/alice", json!({"_key": "bobLikesAlice"}))
        .unwrap();

    assert_eq!(male.remove("bob").unwrap(), 3);
    let store = db.store();
    assert_eq!(store.count("likes").unwrap(), 0);
    assert_eq!(store.count("relation").unwrap(), 0);
}

#[test]
fn test_cascade_sees_definitions_written_to_meta_collection() {
    let registry = GraphRegistry::new(Database::in_memory()).unwrap();
    let social = registry
        .create(
            "social",
            vec![directed_relation("relation", ["female", "male"], ["female", "male"]).unwrap()],
            vec![],
        )
        .unwrap();
    populate(&social);
    let female = social.vertex_collection("female").unwrap();
    female.insert(json!({"_key": "diana"})).unwrap();
    assert_eq!(female.remove("diana").unwrap(), 1);

    let store = registry.database().store();
    store
        .create_collection("admires", CollectionKind::Edge)
        .unwrap();
    store
        .insert(
            "_graphs",
            Document::from_value(json!({
                "_key": "fans",
                "edgeDefinitions": [
                    {"collection": "admires", "from": ["female"], "to": ["male"]}
                ],
                "orphanCollections": []
            }))
            .unwrap(),
        )
        .unwrap();
    store
        .insert_edge(
            "admires",
            &DocumentId::parse("female/alice").unwrap(),
            &DocumentId::parse("male/bob").unwrap(),
            Document::new(),
        )
        .unwrap();

    assert_eq!(female.remove("alice").unwrap(), 3);
    assert_eq!(store.count("admires").unwrap(), 0);
}

#[test]
fn test_shape_check_across_registries() {
    let db = Database::in_memory();
    let first = GraphRegistry::new(db.clone()).unwrap();
    let second = GraphRegistry::new(db.clone()).unwrap();
    second
        .create(
            "social",
            vec![directed_relation("relation", "female", "male").unwrap()],
            vec![],
        )
        .unwrap();

    first
        .create(
            "owners",
            vec![directed_relation("owns", "female", "robots").unwrap()],
            vec![],
        )
        .unwrap();

    let err = second
        .create(
            "garage",
            vec![directed_relation("owns", "male", "robots").unwrap()],
            vec![],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::CollectionUsedInMultiGraphs { ref collection, ref graph }
            if collection == "owns" && graph == "owners"
    ));

    let mut social = second.graph("social").unwrap();
    assert!(matches!(
        social.extend_edge_definitions(directed_relation("owns", "male", "robots").unwrap()),
        Err(GraphError::CollectionUsedInMultiGraphs { .. })
    ));
    social
        .extend_edge_definitions(directed_relation("owns", "female", "robots").unwrap())
        .unwrap();
}
