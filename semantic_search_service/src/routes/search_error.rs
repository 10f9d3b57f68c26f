use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::helper::error_chain_fmt;
use serde_json::json;

use crate::{
    domain::entities::search_query::SearchQueryError,
    ports::vector_store::VectorStoreError,
    use_cases::semantic_search::SemanticSearchError,
};

/// Errors returned by the search handlers, as a JSON body: `{"error": "<message>"}`
#[derive(thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    InvalidQuery(#[from] SearchQueryError),
    #[error("Collection {0} not found")]
    CollectionNotFound(String),
    #[error("The vector store is not available, retry later")]
    StoreUnavailable(#[source] SemanticSearchError),
    #[error("Failed to search contents")]
    InternalError(#[source] SemanticSearchError),
}

impl From<SemanticSearchError> for SearchError {
    fn from(error: SemanticSearchError) -> Self {
        match &error {
            SemanticSearchError::VectorStoreError(VectorStoreError::CollectionNotFound(
                collection_name,
            )) => SearchError::CollectionNotFound(collection_name.clone()),
            SemanticSearchError::VectorStoreError(VectorStoreError::Unavailable(_)) => {
                SearchError::StoreUnavailable(error)
            }
            _ => SearchError::InternalError(error),
        }
    }
}

impl std::fmt::Debug for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SearchError {
    fn status_code(&self) -> StatusCode {
        match self {
            SearchError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            SearchError::CollectionNotFound(_) => StatusCode::NOT_FOUND,
            SearchError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SearchError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from search handler", skip(self), fields(error = ?self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
