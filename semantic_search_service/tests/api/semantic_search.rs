use semantic_search_service::routes::SemanticSearchResponse;
use serde_json::{json, Value as JsonValue};

use crate::helpers::spawn_app;

#[tokio::test]
async fn semantic_search_returns_the_matching_chunks_with_their_fields() {
    let app = spawn_app().await;
    app.seed_documents();

    let response = app
        .post_semantic_search(&json!({ "query": "hello world", "limit": 5 }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: SemanticSearchResponse = response.json().await.expect("Failed to parse body");
    assert_eq!(body.results.len(), 3);
    for hit in &body.results {
        assert!(hit.score > 0.0);
        assert!(hit.page.is_some());
        assert!(hit.source.is_some());
        assert!(hit.text.is_some());
    }
}

#[tokio::test]
async fn semantic_search_hits_are_sorted_by_descending_score() {
    let app = spawn_app().await;
    app.seed_documents();

    let response = app
        .post_semantic_search(&json!({ "query": "hello world", "limit": 5 }))
        .await;

    let body: SemanticSearchResponse = response.json().await.expect("Failed to parse body");
    let scores: Vec<f32> = body.results.iter().map(|hit| hit.score).collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[tokio::test]
async fn semantic_search_never_returns_more_hits_than_the_limit() {
    let app = spawn_app().await;
    app.seed_documents();

    let response = app
        .post_semantic_search(&json!({ "query": "hello world", "limit": 2 }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: SemanticSearchResponse = response.json().await.expect("Failed to parse body");
    assert_eq!(body.results.len(), 2);
}

#[tokio::test]
async fn semantic_search_uses_the_default_limit_when_none_is_given() {
    let app = spawn_app().await;
    for id in 0..20 {
        app.store.insert_text(
            &app.collection_name,
            id,
            id,
            "hello.pdf",
            &format!("hello number {}", id),
        );
    }

    let response = app.post_semantic_search(&json!({ "query": "hello" })).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: SemanticSearchResponse = response.json().await.expect("Failed to parse body");
    assert_eq!(
        body.results.len() as u64,
        app.settings.search.default_limit
    );
}

#[tokio::test]
async fn semantic_search_with_a_limit_of_zero_returns_no_hit() {
    let app = spawn_app().await;
    app.seed_documents();

    let response = app
        .post_semantic_search(&json!({ "query": "hello world", "limit": 0 }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: SemanticSearchResponse = response.json().await.expect("Failed to parse body");
    assert!(body.results.is_empty());
}

#[tokio::test]
async fn semantic_search_on_a_missing_collection_returns_a_404() {
    let app = spawn_app().await;
    app.store.drop_collection(&app.collection_name);

    let response = app
        .post_semantic_search(&json!({ "query": "hello world", "limit": 5 }))
        .await;

    assert_eq!(response.status().as_u16(), 404);
    assert_eq!(
        response
            .headers()
            .get("Content-Type")
            .and_then(|value| value.to_str().ok()),
        Some("application/json")
    );
    let body: JsonValue = response.json().await.expect("Failed to parse body");
    assert_eq!(
        body["error"],
        json!(format!("Collection {} not found", app.collection_name))
    );
}

#[tokio::test]
async fn semantic_search_returns_a_400_when_the_query_is_invalid() {
    let app = spawn_app().await;
    let max_limit = app.settings.search.max_limit;
    let test_cases = vec![
        (json!({ "query": "", "limit": 5 }), "empty query"),
        (json!({ "query": "   ", "limit": 5 }), "blank query"),
        (json!({ "query": "hello", "limit": -1 }), "negative limit"),
        (
            json!({ "query": "hello", "limit": max_limit + 1 }),
            "limit above the maximum",
        ),
        (json!({ "limit": 5 }), "missing query"),
        (json!({ "query": "hello", "limit": "five" }), "non numeric limit"),
    ];

    for (body, description) in test_cases {
        let response = app.post_semantic_search(&body).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request for: {}.",
            description
        );
        let body: JsonValue = response.json().await.expect("Failed to parse body");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn semantic_search_returns_a_400_for_a_malformed_json_body() {
    let app = spawn_app().await;

    let response = app.post_semantic_search_raw("{\"query\": \"hello\"").await;

    assert_eq!(response.status().as_u16(), 400);
    let body: JsonValue = response.json().await.expect("Failed to parse body");
    assert!(body["error"].is_string());
}
