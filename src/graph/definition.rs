//! Persisted graph definitions

use super::error::{GraphError, GraphResult};
use super::relation::RelationDefinition;
use crate::store::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A named graph: edge definitions plus orphan vertex collections
///
/// Stored in the meta collection with the graph name as `_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDefinition {
    #[serde(rename = "_key")]
    pub name: String,
    #[serde(rename = "edgeDefinitions", default)]
    pub edge_definitions: Vec<RelationDefinition>,
    #[serde(rename = "orphanCollections", default)]
    pub orphan_collections: Vec<String>,
}

impl GraphDefinition {
    pub fn new(
        name: impl Into<String>,
        edge_definitions: Vec<RelationDefinition>,
        orphan_collections: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            edge_definitions,
            orphan_collections,
        }
    }

    /// Relation declared for an edge collection
    pub fn relation(&self, edge_collection: &str) -> Option<&RelationDefinition> {
        self.edge_definitions
            .iter()
            .find(|r| r.collection == edge_collection)
    }

    pub(crate) fn relation_mut(&mut self, edge_collection: &str) -> Option<&mut RelationDefinition> {
        self.edge_definitions
            .iter_mut()
            .find(|r| r.collection == edge_collection)
    }

    pub fn edge_collection_names(&self) -> BTreeSet<String> {
        self.edge_definitions
            .iter()
            .map(|r| r.collection.clone())
            .collect()
    }

    /// Vertex collections referenced by some relation (orphans excluded)
    pub fn relation_vertex_collections(&self) -> BTreeSet<String> {
        self.edge_definitions
            .iter()
            .flat_map(|r| r.vertex_collections())
            .collect()
    }

    /// Every vertex collection of the graph, orphans included
    pub fn vertex_collection_names(&self) -> BTreeSet<String> {
        let mut names = self.relation_vertex_collections();
        names.extend(self.orphan_collections.iter().cloned());
        names
    }

    /// Whether the graph uses `collection` in any role
    pub fn references(&self, collection: &str) -> bool {
        self.relation(collection).is_some()
            || self.edge_definitions.iter().any(|r| r.references(collection))
            || self.orphan_collections.iter().any(|o| o == collection)
    }

    /// Every collection the graph uses in any role
    pub fn collection_names(&self) -> BTreeSet<String> {
        let mut names = self.vertex_collection_names();
        names.extend(self.edge_collection_names());
        names
    }

    /// Drop orphans now used by a relation; `released` collections that no
    /// relation uses any more become orphans
    pub(crate) fn reconcile_orphans(&mut self, released: &BTreeSet<String>) {
        let used = self.relation_vertex_collections();
        self.orphan_collections.retain(|o| !used.contains(o));
        for collection in released {
            if !used.contains(collection) && !self.orphan_collections.contains(collection) {
                self.orphan_collections.push(collection.clone());
            }
        }
        self.orphan_collections.sort();
    }

    /// Structural checks within this one definition
    pub fn validate(&self) -> GraphResult<()> {
        if self.name.is_empty() {
            return Err(GraphError::MissingName);
        }
        let mut seen = BTreeSet::new();
        for relation in &self.edge_definitions {
            relation.validate()?;
            if !seen.insert(relation.collection.as_str()) {
                return Err(GraphError::CollectionMultiUse(relation.collection.clone()));
            }
        }
        let used = self.relation_vertex_collections();
        for orphan in &self.orphan_collections {
            if orphan.is_empty() || orphan.contains('/') {
                return Err(GraphError::InvalidParameter(format!(
                    "invalid orphan collection name '{}'",
                    orphan
                )));
            }
            if used.contains(orphan) {
                return Err(GraphError::CollectionUsedInEdgeDefinition(orphan.clone()));
            }
        }
        Ok(())
    }

    pub fn to_document(&self) -> GraphResult<Document> {
        let value = serde_json::to_value(self)
            .map_err(|e| GraphError::InvalidParameter(e.to_string()))?;
        Ok(Document::from_value(value)?)
    }

    pub fn from_document(document: Document) -> GraphResult<Self> {
        serde_json::from_value(document.into_value())
            .map_err(|e| GraphError::MalformedEdgeDefinition(e.to_string()))
    }
}

impl fmt::Display for GraphDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relations: Vec<String> = self.edge_definitions.iter().map(|r| r.to_string()).collect();
        let vertices: Vec<String> = self.vertex_collection_names().into_iter().collect();
        write!(
            f,
            "[ Graph {} EdgeDefinitions: [{}] VertexCollections: [{}] ]",
            self.name,
            relations.join(", "),
            vertices.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn social() -> GraphDefinition {
        GraphDefinition::new(
            "social",
            vec![RelationDefinition::new("relation", ["female", "male"], ["female", "male"])],
            vec!["robots".to_string()],
        )
    }

    #[test]
    fn test_document_roundtrip_shape() {
        let document = social().to_document().unwrap();
        assert_eq!(
            document.into_value(),
            json!({
                "_key": "social",
                "edgeDefinitions": [
                    {"collection": "relation", "from": ["female", "male"], "to": ["female", "male"]}
                ],
                "orphanCollections": ["robots"]
            })
        );

        let stored = Document::from_value(json!({
            "_key": "social", "_id": "_graphs/social", "edgeDefinitions": []
        }))
        .unwrap();
        let definition = GraphDefinition::from_document(stored).unwrap();
        assert_eq!(definition.name, "social");
        assert!(definition.orphan_collections.is_empty());
    }

    #[test]
    fn test_collection_sets() {
        let graph = social();
        assert_eq!(
            graph.vertex_collection_names().into_iter().collect::<Vec<_>>(),
            vec!["female", "male", "robots"]
        );
        assert!(graph.references("relation"));
        assert!(graph.references("robots"));
        assert!(!graph.references("aliens"));
        assert_eq!(graph.collection_names().len(), 4);
    }

    #[test]
    fn test_validate() {
        assert!(social().validate().is_ok());

        let mut twice = social();
        twice
            .edge_definitions
            .push(RelationDefinition::new("relation", "a", "b"));
        assert!(matches!(
            twice.validate(),
            Err(GraphError::CollectionMultiUse(_))
        ));

        let mut orphan_clash = social();
        orphan_clash.orphan_collections.push("male".to_string());
        assert!(matches!(
            orphan_clash.validate(),
            Err(GraphError::CollectionUsedInEdgeDefinition(_))
        ));

        assert!(matches!(
            GraphDefinition::new("", vec![], vec![]).validate(),
            Err(GraphError::MissingName)
        ));
    }

    #[test]
    fn test_reconcile_orphans() {
        let mut graph = social();
        graph.orphan_collections.push("female".to_string());
        graph.edge_definitions[0] = RelationDefinition::new("relation", "male", "male");

        let released: BTreeSet<String> = ["female".to_string()].into_iter().collect();
        graph.reconcile_orphans(&released);
        assert_eq!(graph.orphan_collections, vec!["female", "robots"]);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            social().to_string(),
            "[ Graph social EdgeDefinitions: [relation: [female, male] -> [female, male]] \
             VertexCollections: [female, male, robots] ]"
        );
    }
}
