use actix_web::{web, HttpResponse};
use tracing::info;

use crate::{
    domain::entities::{search_hit::ContentHit, search_query::SearchQuery},
    routes::SearchError,
    startup::SearchContext,
    use_cases::semantic_search::SemanticSearchUseCase,
};

/// Searches the text chunks closest to the query
///
/// Without a `limit` in the body, the configured default limit is used.
#[tracing::instrument(name = "Semantic search handler", skip(use_case, context, body))]
pub async fn semantic_search(
    use_case: web::Data<SemanticSearchUseCase>,
    context: web::Data<SearchContext>,
    body: web::Json<SemanticSearchBodyData>,
) -> Result<HttpResponse, SearchError> {
    let SemanticSearchBodyData { query, limit } = body.into_inner();
    let max_limit = context.settings.max_limit;

    let query = match limit {
        Some(limit) => SearchQuery::parse(&query, limit, max_limit)?,
        None => SearchQuery::new(&query, context.settings.default_limit, max_limit)?,
    };
    info!("Searching contents for query: {}", query.text());

    let hits = use_case
        .search(&context.collection_name, query.text(), query.limit())
        .await?;

    Ok(HttpResponse::Ok().json(SemanticSearchResponse {
        results: hits.into_iter().map(ContentHit::from).collect(),
    }))
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct SemanticSearchBodyData {
    pub query: String,
    pub limit: Option<i64>,
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct SemanticSearchResponse {
    pub results: Vec<ContentHit>,
}
