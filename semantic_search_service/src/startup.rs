use actix_web::{
    dev::Server,
    error::InternalError,
    web::{self, Data},
    App, HttpResponse, HttpServer,
};
use qdrant_client::{Qdrant, QdrantError};
use secrecy::ExposeSecret;
use serde_json::json;
use std::{net::TcpListener, sync::Arc};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::{QdrantSettings, SearchSettings, SearchSettingsError, Settings},
    domain::{
        entities::collection_schema::CollectionSchemaError,
        services::bm25_embedding::Bm25EmbeddingService,
    },
    ports::{sparse_embedder::SparseEmbedder, vector_store::VectorStore},
    repositories::qdrant_vector_store::QdrantVectorStore,
    routes::{health_check, query_text, root, semantic_search},
    use_cases::{
        ensure_collection::{ensure_collection_with_retry, CollectionBootstrap, EnsureCollectionError},
        semantic_search::SemanticSearchUseCase,
    },
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
    collection_bootstrap: CollectionBootstrap,
}

/// Read-only settings shared by the search handlers
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub collection_name: String,
    pub settings: SearchSettings,
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    QdrantError(#[from] QdrantError),
    #[error(transparent)]
    CollectionSchemaError(#[from] CollectionSchemaError),
    #[error(transparent)]
    SearchSettingsError(#[from] SearchSettingsError),
    #[error(transparent)]
    EnsureCollectionError(#[from] EnsureCollectionError),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl Application {
    /// Builds the application on top of Qdrant and the BM25 embedder
    ///
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building application", skip(settings))]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let client = get_qdrant_client(&settings.qdrant)?;
        let store = Arc::new(QdrantVectorStore::new(client));
        let embedder = Arc::new(Bm25EmbeddingService::new(
            settings.embedding.bm25_parameters(),
        ));

        Self::build_with(settings, nb_workers, store, embedder).await
    }

    /// Builds the application with the given vector store and embedder
    ///
    /// The collection is created before the server starts listening: the server never
    /// serves a search on a missing collection because of a startup race.
    #[tracing::instrument(name = "Building application with its adapters", skip_all)]
    pub async fn build_with(
        settings: Settings,
        nb_workers: Option<usize>,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn SparseEmbedder>,
    ) -> Result<Self, ApplicationBuildError> {
        settings.search.validate()?;
        let schema = settings.qdrant.collection_schema()?;
        let collection_bootstrap = ensure_collection_with_retry(
            store.as_ref(),
            &settings.qdrant.collection,
            &schema,
            settings.qdrant.bootstrap_retry_policy(),
        )
        .await?;

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let use_case = SemanticSearchUseCase::new(store, embedder);
        let context = SearchContext {
            collection_name: settings.qdrant.collection.clone(),
            settings: settings.search.clone(),
        };

        let server = run(listener, nb_workers, use_case, context)?;

        Ok(Self {
            server,
            port,
            collection_bootstrap,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the collection was created at startup or already existed
    pub fn collection_bootstrap(&self) -> CollectionBootstrap {
        self.collection_bootstrap
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
///
/// # Parameters
/// - nb_workers: number of actix-web workers
///   if `None`, the number of available physical CPUs is used as the worker count.
pub fn run(
    listener: TcpListener,
    nb_workers: Option<usize>,
    use_case: SemanticSearchUseCase,
    context: SearchContext,
) -> Result<Server, std::io::Error> {
    // Shared among all workers
    let use_case = Data::new(use_case);
    let context = Data::new(context);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(json_config())
            .route("/", web::get().to(root))
            .route("/health_check", web::get().to(health_check))
            .route("/semantic_search", web::post().to(semantic_search))
            .route("/query/{text}", web::get().to(query_text))
            .app_data(use_case.clone())
            .app_data(context.clone())
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web settings (number of workers = number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    // No await
    Ok(server.run())
}

/// Malformed JSON bodies are rejected with the same error envelope as the handlers
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|error, _request| {
        let response = HttpResponse::BadRequest().json(json!({ "error": error.to_string() }));
        InternalError::from_response(error, response).into()
    })
}

#[tracing::instrument(name = "Creating Qdrant client", skip(settings), fields(url = %settings.get_grpc_url()))]
pub fn get_qdrant_client(settings: &QdrantSettings) -> Result<Qdrant, QdrantError> {
    let mut builder = Qdrant::from_url(&settings.get_grpc_url()).timeout(settings.timeout());

    if let Some(api_key) = &settings.api_key {
        builder = builder.api_key(api_key.expose_secret().clone());
    }

    builder.build()
}
