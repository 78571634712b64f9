//! Vertex collection -> referencing edge collection index
//!
//! Built from every persisted graph definition. Cascading deletes use it to
//! find the edge collections that may hold edges pointing at a document, and
//! definition edits use it to find the shape a shared edge collection already
//! has elsewhere.

use super::definition::GraphDefinition;
use super::error::{GraphError, GraphResult};
use super::relation::RelationDefinition;
use std::collections::{BTreeSet, HashMap};

/// Cross-graph relation index
#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    /// Vertex collection -> edge collections whose relation lists it in from/to
    referencing: HashMap<String, BTreeSet<String>>,
    /// Edge collection -> (declared shape, graphs declaring it)
    shapes: HashMap<String, (RelationDefinition, BTreeSet<String>)>,
}

impl RelationIndex {
    /// Index every relation of every definition
    pub fn build<'a, I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = &'a GraphDefinition>,
    {
        let mut index = RelationIndex::default();
        for definition in definitions {
            for relation in &definition.edge_definitions {
                for vertex_collection in relation.vertex_collections() {
                    index
                        .referencing
                        .entry(vertex_collection)
                        .or_default()
                        .insert(relation.collection.clone());
                }
                index
                    .shapes
                    .entry(relation.collection.clone())
                    .or_insert_with(|| (relation.clone(), BTreeSet::new()))
                    .1
                    .insert(definition.name.clone());
            }
        }
        index
    }

    /// Edge collections that may contain edges touching documents of `collection`
    pub fn referencing_edge_collections(&self, collection: &str) -> BTreeSet<String> {
        self.referencing.get(collection).cloned().unwrap_or_default()
    }

    /// Shape of a shared edge collection, if any graph declares it
    pub fn shape(&self, edge_collection: &str) -> Option<&RelationDefinition> {
        self.shapes.get(edge_collection).map(|(relation, _)| relation)
    }

    /// Graphs declaring `edge_collection`
    pub fn graphs_declaring(&self, edge_collection: &str) -> BTreeSet<String> {
        self.shapes
            .get(edge_collection)
            .map(|(_, graphs)| graphs.clone())
            .unwrap_or_default()
    }

    /// A relation may reuse an edge collection only with the same from/to sets
    pub fn check_compatible(&self, relation: &RelationDefinition) -> GraphResult<()> {
        match self.shapes.get(&relation.collection) {
            Some((existing, graphs)) if !existing.same_shape(relation) => {
                Err(GraphError::CollectionUsedInMultiGraphs {
                    collection: relation.collection.clone(),
                    graph: graphs.iter().next().cloned().unwrap_or_default(),
                })
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions() -> Vec<GraphDefinition> {
        vec![
            GraphDefinition::new(
                "social",
                vec![RelationDefinition::new("relation", ["female", "male"], ["female", "male"])],
                vec![],
            ),
            GraphDefinition::new(
                "audit",
                vec![
                    RelationDefinition::new("relation", ["female", "male"], ["female", "male"]),
                    RelationDefinition::new("flags", ["relation"], ["reports"]),
                ],
                vec![],
            ),
        ]
    }

    #[test]
    fn test_referencing_edge_collections() {
        let index = RelationIndex::build(&definitions());
        assert_eq!(
            index.referencing_edge_collections("male").into_iter().collect::<Vec<_>>(),
            vec!["relation"]
        );
        // edges can be endpoints of other edges
        assert_eq!(
            index.referencing_edge_collections("relation").into_iter().collect::<Vec<_>>(),
            vec!["flags"]
        );
        assert!(index.referencing_edge_collections("robots").is_empty());
        assert_eq!(index.graphs_declaring("relation").len(), 2);
    }

    #[test]
    fn test_check_compatible() {
        let index = RelationIndex::build(&definitions());
        assert!(index
            .check_compatible(&RelationDefinition::new("relation", ["male", "female"], ["female", "male"]))
            .is_ok());
        assert!(index
            .check_compatible(&RelationDefinition::new("fresh", "a", "b"))
            .is_ok());

        let err = index
            .check_compatible(&RelationDefinition::new("relation", "female", "male"))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::CollectionUsedInMultiGraphs { ref collection, ref graph }
                if collection == "relation" && graph == "audit"
        ));
        assert!(index.shape("flags").is_some());
    }
}
