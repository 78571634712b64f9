//! Relation (edge definition) types and builders

use super::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One or many collection names
///
/// Lets relation builders take a single name or a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionList(Vec<String>);

impl CollectionList {
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for CollectionList {
    fn from(name: &str) -> Self {
        CollectionList(vec![name.to_string()])
    }
}

impl From<String> for CollectionList {
    fn from(name: String) -> Self {
        CollectionList(vec![name])
    }
}

impl From<Vec<String>> for CollectionList {
    fn from(names: Vec<String>) -> Self {
        CollectionList(names)
    }
}

impl From<Vec<&str>> for CollectionList {
    fn from(names: Vec<&str>) -> Self {
        CollectionList(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for CollectionList {
    fn from(names: &[&str]) -> Self {
        CollectionList(names.iter().map(|s| s.to_string()).collect())
    }
}

impl From<&[String]> for CollectionList {
    fn from(names: &[String]) -> Self {
        CollectionList(names.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for CollectionList {
    fn from(names: [&str; N]) -> Self {
        CollectionList(names.iter().map(|s| s.to_string()).collect())
    }
}

/// Edge collection plus the vertex collections its edges may connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    pub collection: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

impl RelationDefinition {
    /// Build a relation; `from`/`to` are sorted and de-duplicated
    pub fn new(
        collection: impl Into<String>,
        from: impl Into<CollectionList>,
        to: impl Into<CollectionList>,
    ) -> Self {
        RelationDefinition {
            collection: collection.into(),
            from: from.into().into_vec(),
            to: to.into().into_vec(),
        }
        .normalized()
    }

    pub fn normalized(mut self) -> Self {
        for list in [&mut self.from, &mut self.to] {
            list.sort();
            list.dedup();
        }
        self
    }

    /// Structural check of a relation read from outside
    pub fn validate(&self) -> GraphResult<()> {
        let bad_name = |name: &String| name.is_empty() || name.contains('/');
        if bad_name(&self.collection) {
            return Err(GraphError::MalformedEdgeDefinition(format!(
                "invalid edge collection name '{}'",
                self.collection
            )));
        }
        if self.from.is_empty() || self.to.is_empty() {
            return Err(GraphError::MalformedEdgeDefinition(format!(
                "{}: from and to must not be empty",
                self.collection
            )));
        }
        if let Some(name) = self.from.iter().chain(&self.to).find(|n| bad_name(*n)) {
            return Err(GraphError::MalformedEdgeDefinition(format!(
                "{}: invalid vertex collection name '{}'",
                self.collection, name
            )));
        }
        Ok(())
    }

    /// Union of `from` and `to`
    pub fn vertex_collections(&self) -> BTreeSet<String> {
        self.from.iter().chain(&self.to).cloned().collect()
    }

    /// Whether `vertex_collection` appears in `from` or `to`
    pub fn references(&self, vertex_collection: &str) -> bool {
        self.from.iter().chain(&self.to).any(|c| c == vertex_collection)
    }

    /// Whether an edge between these vertex collections is permitted
    pub fn allows(&self, from_collection: &str, to_collection: &str) -> bool {
        self.from.iter().any(|c| c == from_collection) && self.to.iter().any(|c| c == to_collection)
    }

    /// Same `from`/`to` sets, regardless of order and duplicates
    pub fn same_shape(&self, other: &RelationDefinition) -> bool {
        let set = |list: &[String]| list.iter().cloned().collect::<BTreeSet<_>>();
        set(&self.from) == set(&other.from) && set(&self.to) == set(&other.to)
    }
}

impl fmt::Display for RelationDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}] -> [{}]",
            self.collection,
            self.from.join(", "),
            self.to.join(", ")
        )
    }
}

fn check_relation_input(name: &str, lists: &[&CollectionList]) -> GraphResult<()> {
    if name.is_empty() {
        return Err(GraphError::InvalidParameter(
            "relation name must not be empty".to_string(),
        ));
    }
    for list in lists {
        if list.is_empty() || list.0.iter().any(String::is_empty) {
            return Err(GraphError::InvalidParameter(format!(
                "relation {}: vertex collections must be a non-empty name or list of names",
                name
            )));
        }
    }
    Ok(())
}

/// Relation whose edges go from a `from` collection to a `to` collection
pub fn directed_relation(
    name: &str,
    from: impl Into<CollectionList>,
    to: impl Into<CollectionList>,
) -> GraphResult<RelationDefinition> {
    let from = from.into();
    let to = to.into();
    check_relation_input(name, &[&from, &to])?;
    Ok(RelationDefinition::new(name, from, to))
}

/// Relation whose edges may connect any two of `collections`
pub fn undirected_relation(
    name: &str,
    collections: impl Into<CollectionList>,
) -> GraphResult<RelationDefinition> {
    let collections = collections.into();
    check_relation_input(name, &[&collections])?;
    Ok(RelationDefinition::new(name, collections.clone(), collections))
}

/// Collect relations into an edge definition list
pub fn edge_definitions<I>(relations: I) -> Vec<RelationDefinition>
where
    I: IntoIterator<Item = RelationDefinition>,
{
    relations.into_iter().collect()
}

/// Append relations to an edge definition list
pub fn extend_edge_definitions<I>(definitions: &mut Vec<RelationDefinition>, relations: I)
where
    I: IntoIterator<Item = RelationDefinition>,
{
    definitions.extend(relations);
}
