use async_trait::async_trait;
use common::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use once_cell::sync::Lazy;
use semantic_search_service::{
    configuration::{get_configuration, Settings},
    domain::{
        entities::{
            collection_schema::CollectionSchema,
            search_hit::{PointId, SearchHit},
            sparse_embedding::SparseEmbedding,
        },
        services::bm25_embedding::Bm25EmbeddingService,
    },
    ports::{
        sparse_embedder::SparseEmbedder,
        vector_store::{SparseSearchRequest, VectorStore, VectorStoreError},
    },
    startup::Application,
    use_cases::ensure_collection::CollectionBootstrap,
};
use serde_json::{json, Map, Value as JsonValue};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

// Ensures that the `tracing` stack is only initialized once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    // The sink is part of the type returned by `get_tracing_subscriber`: both branches can't share a variable
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_tracing_subscriber(subscriber).expect("Failed to initialize tracing");
    } else {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_tracing_subscriber(subscriber).expect("Failed to initialize tracing");
    };
});

struct StoredPoint {
    id: PointId,
    vector: SparseEmbedding,
    payload: Map<String, JsonValue>,
}

struct StoredCollection {
    schema: CollectionSchema,
    points: Vec<StoredPoint>,
}

/// Vector store keeping its collections in memory
///
/// Sparse searches score the points with a dot product between the query vector and the point vector.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: Mutex<HashMap<String, StoredCollection>>,
    nb_creations: Mutex<usize>,
}

impl InMemoryVectorStore {
    pub fn schema(&self, collection_name: &str) -> Option<CollectionSchema> {
        self.collections
            .lock()
            .unwrap()
            .get(collection_name)
            .map(|collection| collection.schema.clone())
    }

    pub fn nb_creations(&self) -> usize {
        *self.nb_creations.lock().unwrap()
    }

    pub fn drop_collection(&self, collection_name: &str) {
        self.collections.lock().unwrap().remove(collection_name);
    }

    /// Indexes a text chunk, embedded with the same BM25 embedder as the one used by the app
    pub fn insert_text(&self, collection_name: &str, id: u64, page: u64, source: &str, text: &str) {
        let vector = embedder()
            .embed(&[text.to_string()])
            .expect("Failed to embed text")
            .remove(0);
        let payload = json!({ "page": page, "source": source, "text": text });

        self.collections
            .lock()
            .unwrap()
            .get_mut(collection_name)
            .expect("Unknown collection")
            .points
            .push(StoredPoint {
                id: PointId::Num(id),
                vector,
                payload: payload.as_object().cloned().unwrap_or_default(),
            });
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn collection_exists(&self, collection_name: &str) -> Result<bool, VectorStoreError> {
        Ok(self.collections.lock().unwrap().contains_key(collection_name))
    }

    async fn create_collection(
        &self,
        collection_name: &str,
        schema: &CollectionSchema,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(collection_name) {
            return Err(VectorStoreError::CollectionAlreadyExists(
                collection_name.to_string(),
            ));
        }

        collections.insert(
            collection_name.to_string(),
            StoredCollection {
                schema: schema.clone(),
                points: vec![],
            },
        );
        *self.nb_creations.lock().unwrap() += 1;
        Ok(())
    }

    async fn search_batch(
        &self,
        collection_name: &str,
        requests: Vec<SparseSearchRequest>,
    ) -> Result<Vec<Vec<SearchHit>>, VectorStoreError> {
        let collections = self.collections.lock().unwrap();
        let collection = collections
            .get(collection_name)
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection_name.to_string()))?;

        let results = requests
            .iter()
            .map(|request| {
                let mut hits: Vec<SearchHit> = collection
                    .points
                    .iter()
                    .map(|point| SearchHit {
                        id: point.id.clone(),
                        score: point.vector.dot(&request.vector),
                        payload: if request.with_payload {
                            point.payload.clone()
                        } else {
                            Map::new()
                        },
                    })
                    .filter(|hit| hit.score > 0.0)
                    .collect();
                hits.sort_by(|a, b| b.score.total_cmp(&a.score));
                hits.truncate(request.limit as usize);
                hits
            })
            .collect();

        Ok(results)
    }
}

pub fn embedder() -> Bm25EmbeddingService {
    Bm25EmbeddingService::new(
        get_configuration()
            .expect("Failed to read configuration.")
            .embedding
            .bm25_parameters(),
    )
}

pub struct TestApp {
    pub address: String,
    pub collection_name: String,
    pub collection_bootstrap: CollectionBootstrap,
    /// Store used to assert checks and to seed documents
    pub store: Arc<InMemoryVectorStore>,
    pub settings: Settings,
}

/// A test API client / test suite
impl TestApp {
    pub async fn post_semantic_search(&self, body: &JsonValue) -> reqwest::Response {
        reqwest::Client::new()
            .post(&format!("{}/semantic_search", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_semantic_search_raw(&self, body: &str) -> reqwest::Response {
        reqwest::Client::new()
            .post(&format!("{}/semantic_search", &self.address))
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_query_text(&self, text: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(&format!("{}/query/{}", &self.address, text))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Seeds the collection with 3 chunks about cars and 1 unrelated chunk
    pub fn seed_documents(&self) {
        let documents = [
            (1, 1, "hello.pdf", "Hello world, this is the car manual"),
            (2, 4, "hello.pdf", "The world of engines: hello mechanics"),
            (3, 9, "greetings.pdf", "Say hello before changing the oil"),
            (4, 2, "recipes.pdf", "Bake the bread for forty minutes"),
        ];

        for (id, page, source, text) in documents {
            self.store
                .insert_text(&self.collection_name, id, page, source, text);
        }
    }
}

/// Launches the server as a background task, on top of a fresh in-memory vector store
pub async fn spawn_app() -> TestApp {
    spawn_app_with_store(Arc::new(InMemoryVectorStore::default())).await
}

/// Launches the server as a background task, on top of the given vector store
///
/// When a tokio runtime is shut down all tasks spawned on it are dropped.
/// tokio::test spins up a new runtime at the beginning of each test case and they shut down at the end of each test case.
pub async fn spawn_app_with_store(store: Arc<InMemoryVectorStore>) -> TestApp {
    spawn_app_with(test_settings(), store).await
}

/// Randomizes configuration to ensure test isolation
pub fn test_settings() -> Settings {
    let mut c = get_configuration().expect("Failed to read configuration.");
    c.qdrant.collection = format!("test_{}", Uuid::new_v4());
    // Port 0 triggers an OS scan for an available port
    c.application.port = 0;
    c
}

/// Embedder of the test apps, with the configured BM25 parameters
pub fn test_embedder() -> Arc<dyn SparseEmbedder> {
    Arc::new(embedder())
}

/// Launches the server with the given settings, to share a collection between several apps
pub async fn spawn_app_with(settings: Settings, store: Arc<InMemoryVectorStore>) -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    let application =
        Application::build_with(settings.clone(), Some(1), store.clone(), test_embedder())
            .await
            .expect("Failed to build application.");

    let application_port = application.port();
    let collection_bootstrap = application.collection_bootstrap();

    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        collection_name: settings.qdrant.collection.clone(),
        collection_bootstrap,
        store,
        settings,
    }
}
