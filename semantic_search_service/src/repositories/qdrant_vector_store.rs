use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        point_id::PointIdOptions, value::Kind, CreateCollectionBuilder, Distance, PointId,
        ScoredPoint, SearchBatchPointsBuilder, SearchPoints, SearchPointsBuilder,
        SparseIndexConfigBuilder, SparseIndices, SparseVectorParamsBuilder,
        SparseVectorsConfigBuilder, Value as QdrantValue, VectorParamsBuilder,
        VectorsConfigBuilder,
    },
    Qdrant, QdrantError,
};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use tracing::info;

use crate::{
    domain::entities::{
        collection_schema::{CollectionSchema, DistanceMetric},
        search_hit::{PointId as HitId, SearchHit},
    },
    ports::vector_store::{SparseSearchRequest, VectorStore, VectorStoreError},
};

/// Collections and points persisted in Qdrant, through its gRPC API
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    pub fn new(client: Qdrant) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    #[tracing::instrument(name = "Checking if the collection exists in Qdrant", skip(self))]
    async fn collection_exists(&self, collection_name: &str) -> Result<bool, VectorStoreError> {
        self.client
            .collection_exists(collection_name)
            .await
            .map_err(|error| to_vector_store_error(collection_name, error))
    }

    #[tracing::instrument(name = "Creating the collection in Qdrant", skip(self))]
    async fn create_collection(
        &self,
        collection_name: &str,
        schema: &CollectionSchema,
    ) -> Result<(), VectorStoreError> {
        let mut builder = CreateCollectionBuilder::new(collection_name);

        if schema.dense_fields().next().is_some() {
            let mut vectors_config = VectorsConfigBuilder::default();
            for (name, size, distance) in schema.dense_fields() {
                vectors_config.add_named_vector_params(
                    name,
                    VectorParamsBuilder::new(size, to_qdrant_distance(distance)),
                );
            }
            builder = builder.vectors_config(vectors_config);
        }

        if schema.sparse_fields().next().is_some() {
            let mut sparse_vectors_config = SparseVectorsConfigBuilder::default();
            for (name, on_disk) in schema.sparse_fields() {
                sparse_vectors_config.add_named_vector_params(
                    name,
                    SparseVectorParamsBuilder::default()
                        .index(SparseIndexConfigBuilder::default().on_disk(on_disk)),
                );
            }
            builder = builder.sparse_vectors_config(sparse_vectors_config);
        }

        self.client
            .create_collection(builder)
            .await
            .map_err(|error| to_vector_store_error(collection_name, error))?;

        info!("Created Qdrant collection");
        Ok(())
    }

    #[tracing::instrument(name = "Searching points in Qdrant", skip(self, requests))]
    async fn search_batch(
        &self,
        collection_name: &str,
        requests: Vec<SparseSearchRequest>,
    ) -> Result<Vec<Vec<SearchHit>>, VectorStoreError> {
        let search_points: Vec<SearchPoints> = requests
            .into_iter()
            .map(|request| to_search_points(collection_name, request))
            .collect();

        let response = self
            .client
            .search_batch_points(SearchBatchPointsBuilder::new(
                collection_name,
                search_points,
            ))
            .await
            .map_err(|error| to_vector_store_error(collection_name, error))?;

        response
            .result
            .into_iter()
            .map(|batch| {
                batch
                    .result
                    .into_iter()
                    .map(to_search_hit)
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }
}

fn to_search_points(collection_name: &str, request: SparseSearchRequest) -> SearchPoints {
    let (indices, values) = request.vector.into_parts();

    SearchPointsBuilder::new(collection_name, values, request.limit)
        .vector_name(request.vector_name)
        .sparse_indices(SparseIndices { data: indices })
        .with_payload(request.with_payload)
        .build()
}

fn to_qdrant_distance(distance: DistanceMetric) -> Distance {
    match distance {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Euclid => Distance::Euclid,
        DistanceMetric::Dot => Distance::Dot,
        DistanceMetric::Manhattan => Distance::Manhattan,
    }
}

fn to_search_hit(point: ScoredPoint) -> Result<SearchHit, VectorStoreError> {
    let id = point
        .id
        .and_then(to_hit_id)
        .ok_or_else(|| VectorStoreError::StoreError("Search hit without point id".into()))?;

    Ok(SearchHit {
        id,
        score: point.score,
        payload: to_json_payload(point.payload),
    })
}

fn to_hit_id(point_id: PointId) -> Option<HitId> {
    match point_id.point_id_options? {
        PointIdOptions::Num(num) => Some(HitId::Num(num)),
        PointIdOptions::Uuid(uuid) => Some(HitId::Uuid(uuid)),
    }
}

fn to_json_payload(payload: HashMap<String, QdrantValue>) -> Map<String, JsonValue> {
    payload
        .into_iter()
        .map(|(key, value)| (key, to_json_value(value)))
        .collect()
}

fn to_json_value(value: QdrantValue) -> JsonValue {
    match value.kind {
        None | Some(Kind::NullValue(_)) => JsonValue::Null,
        Some(Kind::BoolValue(b)) => JsonValue::Bool(b),
        Some(Kind::IntegerValue(i)) => JsonValue::from(i),
        // NaN and infinite values have no JSON representation
        Some(Kind::DoubleValue(d)) => JsonValue::from(d),
        Some(Kind::StringValue(s)) => JsonValue::String(s),
        Some(Kind::ListValue(list)) => {
            JsonValue::Array(list.values.into_iter().map(to_json_value).collect())
        }
        Some(Kind::StructValue(object)) => JsonValue::Object(to_json_payload(object.fields)),
    }
}

// gRPC status codes answered by Qdrant
const GRPC_DEADLINE_EXCEEDED: i32 = 4;
const GRPC_NOT_FOUND: i32 = 5;
const GRPC_ALREADY_EXISTS: i32 = 6;
const GRPC_UNAVAILABLE: i32 = 14;

const TRANSIENT_ERROR_PATTERNS: [&str; 5] = [
    "unavailable",
    "transport error",
    "connection refused",
    "deadline",
    "timeout",
];

fn to_vector_store_error(collection_name: &str, error: QdrantError) -> VectorStoreError {
    match &error {
        QdrantError::ResponseError { status } => classify_status(
            collection_name,
            status.code() as i32,
            status.message(),
            error.to_string(),
        ),
        QdrantError::ResourceExhaustedError { .. } => {
            VectorStoreError::Unavailable(error.to_string())
        }
        _ => classify_error_message(collection_name, error.to_string()),
    }
}

/// Classifies a status answered by Qdrant from its gRPC code
///
/// Qdrant answers an existing collection with an "invalid argument" status: this one case is
/// read from the status message, without the collection name.
fn classify_status(
    collection_name: &str,
    code: i32,
    status_message: &str,
    error_message: String,
) -> VectorStoreError {
    match code {
        GRPC_NOT_FOUND => VectorStoreError::CollectionNotFound(collection_name.to_string()),
        GRPC_ALREADY_EXISTS => {
            VectorStoreError::CollectionAlreadyExists(collection_name.to_string())
        }
        GRPC_DEADLINE_EXCEEDED | GRPC_UNAVAILABLE => VectorStoreError::Unavailable(error_message),
        _ if without_collection_name(collection_name, status_message)
            .to_lowercase()
            .contains("already exists") =>
        {
            VectorStoreError::CollectionAlreadyExists(collection_name.to_string())
        }
        _ => VectorStoreError::StoreError(error_message),
    }
}

/// Errors raised by the client itself (I/O, conversion, ...), without any gRPC status
fn classify_error_message(collection_name: &str, message: String) -> VectorStoreError {
    let lowercase_message = without_collection_name(collection_name, &message).to_lowercase();

    if TRANSIENT_ERROR_PATTERNS
        .iter()
        .any(|pattern| lowercase_message.contains(pattern))
    {
        VectorStoreError::Unavailable(message)
    } else {
        VectorStoreError::StoreError(message)
    }
}

fn without_collection_name(collection_name: &str, message: &str) -> String {
    if collection_name.is_empty() {
        return message.to_string();
    }
    message.replace(collection_name, "")
}
