use async_trait::async_trait;
use common::helper::error_chain_fmt;

use crate::domain::entities::{
    collection_schema::CollectionSchema, search_hit::SearchHit, sparse_embedding::SparseEmbedding,
};

/// Similarity search on a named sparse vector field
#[derive(Debug, Clone, PartialEq)]
pub struct SparseSearchRequest {
    pub vector_name: String,
    pub vector: SparseEmbedding,
    pub limit: u64,
    pub with_payload: bool,
}

/// External vector database holding the collections
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn collection_exists(&self, collection_name: &str) -> Result<bool, VectorStoreError>;

    /// Creates a collection with the given named vector fields
    ///
    /// Fails with `VectorStoreError::CollectionAlreadyExists` if the collection already exists.
    async fn create_collection(
        &self,
        collection_name: &str,
        schema: &CollectionSchema,
    ) -> Result<(), VectorStoreError>;

    /// Runs several searches in one call, returning the hits of each request in the same order
    async fn search_batch(
        &self,
        collection_name: &str,
        requests: Vec<SparseSearchRequest>,
    ) -> Result<Vec<Vec<SearchHit>>, VectorStoreError>;
}

#[derive(thiserror::Error)]
pub enum VectorStoreError {
    #[error("Collection {0} not found")]
    CollectionNotFound(String),
    #[error("Collection {0} already exists")]
    CollectionAlreadyExists(String),
    #[error("Vector store unavailable: {0}")]
    Unavailable(String),
    #[error("Error from the vector store: {0}")]
    StoreError(String),
}

impl VectorStoreError {
    /// Errors which could disappear by retrying the same call later
    pub fn is_transient(&self) -> bool {
        matches!(self, VectorStoreError::Unavailable(_))
    }
}

impl std::fmt::Debug for VectorStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
