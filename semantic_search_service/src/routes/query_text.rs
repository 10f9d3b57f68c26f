use actix_web::{web, HttpResponse};
use tracing::info;

use crate::{
    domain::entities::{search_hit::SearchHit, search_query::SearchQuery},
    routes::SearchError,
    startup::SearchContext,
    use_cases::semantic_search::SemanticSearchUseCase,
};

/// Searches with the text given in the path, returning the raw hits with their whole payload
#[tracing::instrument(name = "Query text handler", skip(use_case, context))]
pub async fn query_text(
    use_case: web::Data<SemanticSearchUseCase>,
    context: web::Data<SearchContext>,
    text: web::Path<String>,
) -> Result<HttpResponse, SearchError> {
    let query = SearchQuery::new(
        &text,
        context.settings.query_path_limit,
        context.settings.max_limit,
    )?;
    info!("Querying text: {}", query.text());

    let hits = use_case
        .search(&context.collection_name, query.text(), query.limit())
        .await?;

    Ok(HttpResponse::Ok().json(QueryTextResponse { hits }))
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct QueryTextResponse {
    pub hits: Vec<SearchHit>,
}
