use anyhow::Result;
use gharial::{directed_relation, telemetry, Database, Example, GraphRegistry};
use serde_json::json;

fn main() -> Result<()> {
    telemetry::init_logging();

    println!("Gharial general graphs v{}", gharial::version());
    println!("==========================================");
    println!();

    let registry = GraphRegistry::new(Database::in_memory())?;

    // Demo 1: graph setup and traversal
    demo_traversal(&registry)?;

    // Demo 2: cascading delete
    demo_cascade(&registry)?;

    Ok(())
}

fn demo_traversal(registry: &GraphRegistry) -> Result<()> {
    println!("=== Demo 1: Traversal ===");
    let relation = directed_relation("relation", ["female", "male"], ["female", "male"])?;
    let graph = registry.create("social", vec![relation], vec![])?;
    println!("{}", graph);

    let female = graph.vertex_collection("female")?;
    let male = graph.vertex_collection("male")?;
    female.insert(json!({"_key": "alice", "name": "Alice"}))?;
    male.insert(json!({"_key": "bob", "name": "Bob"}))?;
    male.insert(json!({"_key": "charly", "name": "Charly"}))?;

    let relations = graph.edge_collection("relation")?;
    relations.insert(
        "female/alice",
        "male/bob",
        json!({"_key": "aliceAndBob", "type": "married"}),
    )?;
    relations.insert("male/bob", "male/charly", json!({"type": "friend"}))?;

    let mut query = graph.vertices(Example::attributes(json!({"name": "Alice"}))?);
    query.out_edges(Example::all()).to_vertices(Example::all());
    println!("{}", query);
    println!("  {}", query.query_text());
    for vertex in query.to_array()? {
        println!("  -> {}", vertex["name"]);
    }

    let mut friends = graph.vertices("male/bob");
    friends.neighbors(Example::all()).path_vertices();
    println!("{}", friends);
    for path in friends.to_array()? {
        println!("  path: {}", path);
    }

    match graph.edge_collection("relation")?.insert("robots/r2", "male/bob", json!({})) {
        Ok(_) => println!("  unexpected: edge from robots accepted"),
        Err(e) => println!("  rejected: {}", e),
    }
    println!();
    Ok(())
}

fn demo_cascade(registry: &GraphRegistry) -> Result<()> {
    println!("=== Demo 2: Cascading delete ===");
    let graph = registry.graph("social")?;
    println!("  edges of alice before: {}", graph.edges_of("female/alice")?.len());

    let removed = graph.vertex_collection("female")?.remove("alice")?;
    println!("  removed {} documents", removed);
    println!("  edges of alice after: {}", graph.edges_of("female/alice")?.len());

    match graph.edge_collection("relation")?.document("aliceAndBob") {
        Ok(_) => println!("  unexpected: edge survived"),
        Err(e) => println!("  relation/aliceAndBob: {}", e),
    }
    Ok(())
}
