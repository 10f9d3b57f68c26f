use common::helper::error_chain_fmt;
use std::time::Duration;
use tracing::{info, warn};

use crate::{
    domain::entities::collection_schema::CollectionSchema,
    ports::vector_store::{VectorStore, VectorStoreError},
};

/// What the bootstrap did to the vector store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionBootstrap {
    Created,
    AlreadyExists,
}

/// Retries of the bootstrap when the vector store is not reachable yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry, doubled after each attempt
    pub initial_delay: Duration,
}

/// Creates the collection with the given schema, if it does not exist yet
///
/// Idempotent: calling it on an existing collection does not mutate the vector store.
///
/// Several replicas could bootstrap at the same time: if the collection gets created by another one
/// between the existence check and the creation, the collection is considered as already existing.
/// There is no lock, the vector store de-duplicates the creations.
#[tracing::instrument(name = "Ensuring the collection exists", skip(store, schema))]
pub async fn ensure_collection(
    store: &dyn VectorStore,
    collection_name: &str,
    schema: &CollectionSchema,
) -> Result<CollectionBootstrap, EnsureCollectionError> {
    let exists = store
        .collection_exists(collection_name)
        .await
        .map_err(|source| EnsureCollectionError::ExistenceCheckError {
            collection_name: collection_name.to_string(),
            source,
        })?;

    if exists {
        info!("Collection {} already exists", collection_name);
        return Ok(CollectionBootstrap::AlreadyExists);
    }

    info!("Unknown collection {}, creating it ...", collection_name);

    match store.create_collection(collection_name, schema).await {
        Ok(()) => {
            info!("Collection {} created", collection_name);
            Ok(CollectionBootstrap::Created)
        }
        Err(VectorStoreError::CollectionAlreadyExists(_)) => {
            info!(
                "Collection {} was created concurrently by another instance",
                collection_name
            );
            Ok(CollectionBootstrap::AlreadyExists)
        }
        Err(source) => Err(EnsureCollectionError::CreationError {
            collection_name: collection_name.to_string(),
            source,
        }),
    }
}

/// Same as `ensure_collection`, retrying with an exponential backoff on transient store errors
///
/// Returns the last error once the retries are exhausted.
#[tracing::instrument(
    name = "Ensuring the collection exists, with retries",
    skip(store, schema)
)]
pub async fn ensure_collection_with_retry(
    store: &dyn VectorStore,
    collection_name: &str,
    schema: &CollectionSchema,
    retry_policy: RetryPolicy,
) -> Result<CollectionBootstrap, EnsureCollectionError> {
    let mut delay = retry_policy.initial_delay;
    let mut attempt = 0;

    loop {
        match ensure_collection(store, collection_name, schema).await {
            Err(error) if error.is_transient() && attempt < retry_policy.max_retries => {
                attempt += 1;
                warn!(
                    ?error,
                    attempt,
                    "Vector store not reachable, retrying in {} ms ...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            result => return result,
        }
    }
}

#[derive(thiserror::Error)]
pub enum EnsureCollectionError {
    #[error("Failed to check whether collection {collection_name} exists")]
    ExistenceCheckError {
        collection_name: String,
        source: VectorStoreError,
    },
    #[error("Failed to create collection {collection_name}")]
    CreationError {
        collection_name: String,
        source: VectorStoreError,
    },
}

impl EnsureCollectionError {
    pub fn is_transient(&self) -> bool {
        match self {
            EnsureCollectionError::ExistenceCheckError { source, .. }
            | EnsureCollectionError::CreationError { source, .. } => source.is_transient(),
        }
    }
}

impl std::fmt::Debug for EnsureCollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
