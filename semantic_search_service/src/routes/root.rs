use actix_web::HttpResponse;
use serde_json::json;

#[tracing::instrument(name = "Root handler")]
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Hello, Qdrant!" }))
}
