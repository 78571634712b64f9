//! Vertex and edge collections as seen through a graph
//!
//! Reads and plain writes pass through to the store. Two operations are
//! intercepted: edge inserts are checked against the relation, and removes
//! run the cascading delete.

use super::cascade::CascadingDelete;
use super::error::{GraphError, GraphResult};
use super::handle::GraphHandle;
use super::relation::RelationDefinition;
use crate::store::{Document, DocumentId};
use serde_json::Value;
use std::ops::Deref;
use tracing::{debug, info};

/// Pass-through operations shared by vertex and edge collections
#[derive(Debug, Clone, Copy)]
pub struct CollectionHandle<'g> {
    graph: &'g GraphHandle,
    name: &'g str,
}

impl<'g> CollectionHandle<'g> {
    pub(crate) fn new(graph: &'g GraphHandle, name: &'g str) -> Self {
        Self { graph, name }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    fn resolve(&self, id_or_key: &str) -> GraphResult<DocumentId> {
        let id = DocumentId::resolve(self.name, id_or_key)
            .map_err(|_| GraphError::BadDocumentHandle(id_or_key.to_string()))?;
        if id.collection() != self.name {
            return Err(GraphError::BadDocumentHandle(format!(
                "{} does not belong to collection {}",
                id_or_key, self.name
            )));
        }
        Ok(id)
    }

    /// Look up a document by full id or bare key
    pub fn document(&self, id_or_key: &str) -> GraphResult<Document> {
        let id = self.resolve(id_or_key)?;
        Ok(self.graph.db().store().document(&id)?)
    }

    pub fn exists(&self, id_or_key: &str) -> bool {
        self.resolve(id_or_key)
            .map(|id| self.graph.db().store().exists(&id))
            .unwrap_or(false)
    }

    /// Replace a document's body
    pub fn replace(&self, id_or_key: &str, data: Value) -> GraphResult<Document> {
        let id = self.resolve(id_or_key)?;
        let document = Document::from_value(data)?;
        Ok(self.graph.db().store().replace(&id, document)?)
    }

    /// Merge attributes into a document
    pub fn update(&self, id_or_key: &str, patch: Value) -> GraphResult<Document> {
        let id = self.resolve(id_or_key)?;
        let patch = Document::from_value(patch)?;
        Ok(self.graph.db().store().update(&id, patch)?)
    }

    pub fn all(&self) -> GraphResult<Vec<Document>> {
        Ok(self.graph.db().store().all(self.name)?)
    }

    pub fn count(&self) -> GraphResult<usize> {
        Ok(self.graph.db().store().count(self.name)?)
    }

    /// Remove a document and every edge transitively referencing it
    ///
    /// Returns the number of removed documents. Either all of them are
    /// removed or, on error, none.
    pub fn remove(&self, id_or_key: &str) -> GraphResult<usize> {
        let id = self.resolve(id_or_key)?;
        let index = self.graph.catalog().relation_index()?;
        let cascade = CascadingDelete::new(
            self.graph.db().store(),
            &index,
            self.graph.config().max_cascade_size,
        );
        let plan = cascade.plan(&id)?;
        let removed = cascade.execute(self.graph.db().transactions(), &plan)?;
        info!("Removed {} and {} dependent edges", id, removed - 1);
        Ok(removed)
    }
}

/// Vertex collection of a graph
#[derive(Debug, Clone, Copy)]
pub struct VertexCollection<'g> {
    inner: CollectionHandle<'g>,
}

impl<'g> VertexCollection<'g> {
    pub(crate) fn new(graph: &'g GraphHandle, name: &'g str) -> Self {
        Self {
            inner: CollectionHandle::new(graph, name),
        }
    }

    /// Insert a vertex document
    pub fn insert(&self, data: Value) -> GraphResult<Document> {
        let document = Document::from_value(data)?;
        Ok(self.inner.graph.db().store().insert(self.inner.name, document)?)
    }
}

impl<'g> Deref for VertexCollection<'g> {
    type Target = CollectionHandle<'g>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Edge collection of a graph, bound to its relation
#[derive(Debug, Clone, Copy)]
pub struct EdgeCollection<'g> {
    inner: CollectionHandle<'g>,
    relation: &'g RelationDefinition,
}

impl<'g> EdgeCollection<'g> {
    pub(crate) fn new(graph: &'g GraphHandle, relation: &'g RelationDefinition) -> Self {
        Self {
            inner: CollectionHandle::new(graph, &relation.collection),
            relation,
        }
    }

    pub fn relation(&self) -> &RelationDefinition {
        self.relation
    }

    /// Insert an edge from `from` to `to`
    ///
    /// Both handles must be `collection/key`; their collections must be in
    /// the relation's from/to sets. Nothing is written otherwise.
    pub fn insert(&self, from: &str, to: &str, data: Value) -> GraphResult<Document> {
        let parse = |handle: &str| {
            DocumentId::parse(handle).map_err(|_| GraphError::BadDocumentHandle(handle.to_string()))
        };
        let from_id = parse(from)?;
        let to_id = parse(to)?;

        if !self.relation.allows(from_id.collection(), to_id.collection()) {
            return Err(GraphError::InvalidEdge {
                collection: self.relation.collection.clone(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let document = Document::from_value(data)?;
        let edge = self.inner.graph.db().store().insert_edge(
            self.inner.name,
            &from_id,
            &to_id,
            document,
        )?;
        debug!("Inserted edge {} -> {} into {}", from, to, self.inner.name);
        Ok(edge)
    }
}

impl<'g> Deref for EdgeCollection<'g> {
    type Target = CollectionHandle<'g>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
