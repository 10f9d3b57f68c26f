use common::helper::error_chain_fmt;
use secrecy::Secret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time::Duration;

use crate::{
    domain::{
        entities::collection_schema::{CollectionSchema, CollectionSchemaError, DistanceMetric},
        services::bm25_embedding::Bm25Parameters,
    },
    use_cases::ensure_collection::RetryPolicy,
};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub qdrant: QdrantSettings,
    pub embedding: EmbeddingSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QdrantSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub grpc_port: u16,
    /// Only needed for a managed Qdrant cluster
    #[serde(default)]
    pub api_key: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
    /// Collection searched by the service, created at startup if needed
    pub collection: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub dense_vector_size: u64,
    pub dense_vector_distance: String,
    pub sparse_on_disk: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bootstrap_max_retries: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub bootstrap_retry_delay_ms: u64,
}

impl QdrantSettings {
    pub fn get_grpc_url(&self) -> String {
        format!("http://{}:{}", self.host, self.grpc_port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn collection_schema(&self) -> Result<CollectionSchema, CollectionSchemaError> {
        let distance = DistanceMetric::parse(&self.dense_vector_distance)?;
        CollectionSchema::text(self.dense_vector_size, distance, self.sparse_on_disk)
    }

    pub fn bootstrap_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.bootstrap_max_retries,
            initial_delay: Duration::from_millis(self.bootstrap_retry_delay_ms),
        }
    }
}

/// BM25 parameters: they must match the ones used to index the documents
#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub k: f64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub b: f64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub avg_len: f64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub token_max_length: usize,
}

impl EmbeddingSettings {
    pub fn bm25_parameters(&self) -> Bm25Parameters {
        Bm25Parameters {
            k: self.k,
            b: self.b,
            avg_len: self.avg_len,
            token_max_length: self.token_max_length,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchSettings {
    /// Used when the request does not set a limit
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub default_limit: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_limit: u64,
    /// Limit of the `/query/{text}` route, which has no way to set one
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub query_path_limit: u64,
}

impl SearchSettings {
    /// The limits used when the client sets none must be accepted by the limit check itself
    pub fn validate(&self) -> Result<(), SearchSettingsError> {
        if self.default_limit > self.max_limit {
            return Err(SearchSettingsError::DefaultLimitTooLarge {
                default_limit: self.default_limit,
                max_limit: self.max_limit,
            });
        }

        if self.query_path_limit > self.max_limit {
            return Err(SearchSettingsError::QueryPathLimitTooLarge {
                query_path_limit: self.query_path_limit,
                max_limit: self.max_limit,
            });
        }

        Ok(())
    }
}

#[derive(thiserror::Error)]
pub enum SearchSettingsError {
    #[error("search.default_limit ({default_limit}) must be at most search.max_limit ({max_limit})")]
    DefaultLimitTooLarge { default_limit: u64, max_limit: u64 },
    #[error(
        "search.query_path_limit ({query_path_limit}) must be at most search.max_limit ({max_limit})"
    )]
    QueryPathLimitTooLarge { query_path_limit: u64, max_limit: u64 },
}

impl std::fmt::Debug for SearchSettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Extracts app settings from configuration files and env variables
///
/// `base.yaml` should contain shared settings for all environments.
/// A specific env file should be created for each environment: `local.yaml` and `production.yaml`
/// The environment is set with the env var `APP_ENVIRONMENT`.
/// If `APP_ENVIRONMENT` is not set, `local.yaml` is the default.
///
/// Settings are also taken from environment variables: with a prefix of APP and '__' as separator
/// For ex: `APP_QDRANT__COLLECTION=BAR` would set `Settings.qdrant.collection`
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|error| config::ConfigError::Foreign(Box::new(error)))?;

    // Default to `local` if unspecified
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    read_configuration(&base_path.join("configuration"), environment)
}

fn read_configuration(
    configuration_directory: &std::path::Path,
    environment: Environment,
) -> Result<Settings, config::ConfigError> {
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

/// The possible runtime environment for our application.
#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
