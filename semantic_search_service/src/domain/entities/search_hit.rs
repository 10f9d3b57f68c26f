use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Identifier of a point stored in the vector store: an unsigned integer or a UUID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

/// A point returned by a similarity search
///
/// The score is the raw similarity value: its meaning depends on the index type
/// (or distance metric) of the searched vector field.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SearchHit {
    pub id: PointId,
    pub score: f32,
    pub payload: Map<String, JsonValue>,
}

/// A search hit on a text chunk, with the fields written by the ingestion pipeline
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContentHit {
    pub id: PointId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<JsonValue>,
    pub score: f32,
}

impl From<SearchHit> for ContentHit {
    fn from(mut hit: SearchHit) -> Self {
        Self {
            id: hit.id,
            page: hit.payload.remove("page"),
            source: hit.payload.remove("source"),
            text: hit.payload.remove("text"),
            score: hit.score,
        }
    }
}
