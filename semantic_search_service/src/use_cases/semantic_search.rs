use common::helper::error_chain_fmt;
use std::sync::Arc;
use tracing::info;

use crate::{
    domain::entities::{
        collection_schema::SPARSE_VECTOR_NAME, search_hit::SearchHit,
        sparse_embedding::SparseEmbedding,
    },
    ports::{
        sparse_embedder::{SparseEmbedder, SparseEmbedderError},
        vector_store::{SparseSearchRequest, VectorStore, VectorStoreError},
    },
};

/// Translates a text query into a sparse vector search and runs it against the vector store
///
/// Shared by all the actix-web workers: the store client and the embedder are only read.
pub struct SemanticSearchUseCase {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn SparseEmbedder>,
    vector_name: String,
}

impl SemanticSearchUseCase {
    /// Searches on the `text-sparse` vector field
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn SparseEmbedder>) -> Self {
        Self {
            store,
            embedder,
            vector_name: SPARSE_VECTOR_NAME.to_string(),
        }
    }

    /// Returns at most `limit` hits, sorted by descending score
    ///
    /// No retry and no partial result: any embedding or store failure fails the whole search.
    /// A `limit` of 0 returns no hit without calling the store.
    #[tracing::instrument(name = "Semantic search", skip(self))]
    pub async fn search(
        &self,
        collection_name: &str,
        query_text: &str,
        limit: u64,
    ) -> Result<Vec<SearchHit>, SemanticSearchError> {
        if limit == 0 {
            return Ok(vec![]);
        }

        let vector = self.embed_query(query_text).await?;
        info!(
            model = self.embedder.model_name(),
            nb_terms = vector.len(),
            "Embedded query"
        );

        let request = SparseSearchRequest {
            vector_name: self.vector_name.clone(),
            vector,
            limit,
            with_payload: true,
        };

        let mut hits = self
            .store
            .search_batch(collection_name, vec![request])
            .await?
            .into_iter()
            .next()
            .ok_or(SemanticSearchError::MissingSearchResult)?;

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit as usize);

        info!(nb_hits = hits.len(), "Search done");
        Ok(hits)
    }

    /// Embedding is CPU bound: it runs on the blocking thread pool
    async fn embed_query(
        &self,
        query_text: &str,
    ) -> Result<SparseEmbedding, SemanticSearchError> {
        let embedder = self.embedder.clone();
        let texts = vec![query_text.to_string()];

        let embeddings = tokio::task::spawn_blocking(move || embedder.embed(&texts))
            .await
            .map_err(|e| SemanticSearchError::EmbeddingTaskError(e.to_string()))??;

        let nb_embeddings = embeddings.len();
        match <[_; 1]>::try_from(embeddings) {
            Ok([vector]) => Ok(vector),
            Err(_) => Err(SemanticSearchError::UnexpectedEmbeddingsCount(nb_embeddings)),
        }
    }
}

#[derive(thiserror::Error)]
pub enum SemanticSearchError {
    #[error("Failed to embed the query")]
    EmbeddingError(#[from] SparseEmbedderError),
    #[error("Embedding task failed: {0}")]
    EmbeddingTaskError(String),
    #[error("Expected 1 embedding for the query, got {0}")]
    UnexpectedEmbeddingsCount(usize),
    #[error("Failed to search the vector store")]
    VectorStoreError(#[from] VectorStoreError),
    #[error("The vector store did not return any result for the search request")]
    MissingSearchResult,
}

impl std::fmt::Debug for SemanticSearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
