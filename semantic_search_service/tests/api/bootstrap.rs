use semantic_search_service::{
    configuration::SearchSettingsError,
    domain::entities::collection_schema::{
        DistanceMetric, VectorField, DENSE_VECTOR_NAME, SPARSE_VECTOR_NAME,
    },
    startup::{Application, ApplicationBuildError},
    use_cases::ensure_collection::CollectionBootstrap,
};
use std::sync::Arc;

use crate::helpers::{spawn_app, spawn_app_with, test_embedder, test_settings, InMemoryVectorStore};

#[tokio::test]
async fn missing_collection_is_created_with_a_dense_and_a_sparse_field() {
    let app = spawn_app().await;

    assert_eq!(app.collection_bootstrap, CollectionBootstrap::Created);

    let schema = app
        .store
        .schema(&app.collection_name)
        .expect("The collection was not created");
    assert_eq!(
        schema.field(DENSE_VECTOR_NAME),
        Some(&VectorField::Dense {
            size: 1024,
            distance: DistanceMetric::Cosine
        })
    );
    assert_eq!(
        schema.field(SPARSE_VECTOR_NAME),
        Some(&VectorField::Sparse { on_disk: false })
    );
}

#[tokio::test]
async fn starting_twice_on_the_same_collection_creates_it_only_once() {
    let store = Arc::new(InMemoryVectorStore::default());
    let first_app = crate::helpers::spawn_app_with_store(store.clone()).await;

    let mut settings = first_app.settings.clone();
    settings.application.port = 0;
    let second_app = spawn_app_with(settings, store.clone()).await;

    assert_eq!(first_app.collection_bootstrap, CollectionBootstrap::Created);
    assert_eq!(
        second_app.collection_bootstrap,
        CollectionBootstrap::AlreadyExists
    );
    assert_eq!(store.nb_creations(), 1);
    assert_eq!(
        store.schema(&first_app.collection_name),
        store.schema(&second_app.collection_name)
    );
}

#[tokio::test]
async fn startup_fails_when_the_default_limit_exceeds_the_maximum() {
    let store = Arc::new(InMemoryVectorStore::default());
    let mut settings = test_settings();
    settings.search.default_limit = 200;
    settings.search.max_limit = 100;

    let result = Application::build_with(settings, Some(1), store.clone(), test_embedder()).await;

    assert!(matches!(
        result,
        Err(ApplicationBuildError::SearchSettingsError(
            SearchSettingsError::DefaultLimitTooLarge { .. }
        ))
    ));
    // Settings are checked before the vector store is touched
    assert_eq!(store.nb_creations(), 0);
}

#[tokio::test]
async fn startup_fails_when_the_query_path_limit_exceeds_the_maximum() {
    let mut settings = test_settings();
    settings.search.query_path_limit = settings.search.max_limit + 1;

    let result = Application::build_with(
        settings,
        Some(1),
        Arc::new(InMemoryVectorStore::default()),
        test_embedder(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ApplicationBuildError::SearchSettingsError(
            SearchSettingsError::QueryPathLimitTooLarge { .. }
        ))
    ));
}
