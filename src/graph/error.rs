//! Graph layer errors

use crate::query::QueryError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors raised by graph management, mutation and query building
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("graph not found: {0}")]
    GraphNotFound(String),

    #[error("graph already exists: {0}")]
    DuplicateGraph(String),

    #[error("graph name missing")]
    MissingName,

    #[error("malformed edge definition: {0}")]
    MalformedEdgeDefinition(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("multi use of edge collection in edge def: {0}")]
    CollectionMultiUse(String),

    #[error("edge collection already used in edge def of graph {graph}: {collection}")]
    CollectionUsedInMultiGraphs { collection: String, graph: String },

    #[error("edge collection not used in graph: {0}")]
    EdgeCollectionNotUsed(String),

    #[error("vertex collection does not exist or is not part of the graph: {0}")]
    VertexCollectionDoesNotExist(String),

    #[error("not a vertex collection: {0}")]
    WrongCollectionTypeVertex(String),

    #[error("collection used in edge definition: {0}")]
    CollectionUsedInEdgeDefinition(String),

    #[error("collection already used in orphans: {0}")]
    CollectionUsedInOrphans(String),

    #[error("collection is not in orphan collections: {0}")]
    NotInOrphanCollection(String),

    #[error("{0} is not a collection of the expected type")]
    NotACollection(String),

    #[error("invalid edge between {from} and {to}: not allowed by edge definition {collection}")]
    InvalidEdge {
        collection: String,
        from: String,
        to: String,
    },

    #[error("bad document handle: {0}")]
    BadDocumentHandle(String),

    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("invalid example type: {0}")]
    InvalidExampleType(String),

    #[error("cascading delete of {target} exceeds limit of {limit} documents")]
    CascadeLimitExceeded { target: String, limit: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl GraphError {
    /// Whether a graph, collection or document was absent
    ///
    /// Callers branch on this between create-if-missing and hard failure.
    pub fn is_not_found(&self) -> bool {
        match self {
            GraphError::GraphNotFound(_)
            | GraphError::VertexCollectionDoesNotExist(_)
            | GraphError::EdgeCollectionNotUsed(_)
            | GraphError::NotInOrphanCollection(_) => true,
            GraphError::Store(e) => e.is_not_found(),
            GraphError::Query(QueryError::GraphNotFound(_)) => true,
            GraphError::Query(QueryError::Store(e)) => e.is_not_found(),
            _ => false,
        }
    }

    /// Whether the caller passed malformed input
    pub fn is_bad_parameter(&self) -> bool {
        matches!(
            self,
            GraphError::MissingName
                | GraphError::MalformedEdgeDefinition(_)
                | GraphError::InvalidParameter(_)
                | GraphError::BadDocumentHandle(_)
                | GraphError::BadParameter(_)
                | GraphError::InvalidExampleType(_)
        )
    }
}

pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(GraphError::GraphNotFound("g".into()).is_not_found());
        assert!(GraphError::Store(StoreError::DocumentNotFound("a/1".into())).is_not_found());
        assert!(!GraphError::DuplicateGraph("g".into()).is_not_found());

        assert!(GraphError::BadParameter("x".into()).is_bad_parameter());
        assert!(!GraphError::GraphNotFound("g".into()).is_bad_parameter());
    }

    #[test]
    fn test_store_errors_pass_through() {
        let err: GraphError = StoreError::Aborted("forced".into()).into();
        assert_eq!(err.to_string(), "Transaction aborted: forced");
    }
}
