use crate::domain::entities::sparse_embedding::{SparseEmbedding, SparseEmbeddingError};
use common::helper::error_chain_fmt;

/// Text to sparse vector function
///
/// Implementations are shared between all the actix-web workers and called from blocking threads.
pub trait SparseEmbedder: Send + Sync {
    /// Identifier of the model: texts must be embedded with the same model as the stored vectors
    fn model_name(&self) -> &str;

    /// Returns exactly one sparse vector per text, in the same order
    fn embed(&self, texts: &[String]) -> Result<Vec<SparseEmbedding>, SparseEmbedderError>;
}

#[derive(thiserror::Error)]
pub enum SparseEmbedderError {
    #[error("Failed to hash token {token}")]
    TokenHashError {
        token: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    InvalidEmbedding(#[from] SparseEmbeddingError),
    #[error("Embedding model error: {0}")]
    ModelError(String),
}

impl std::fmt::Debug for SparseEmbedderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
