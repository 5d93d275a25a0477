use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes::{downloads, generations, health, social};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(info(
    title = "docugen-server",
    description = "Documentary video generation API",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(generations::GenerationsApi::openapi());
    root.merge(downloads::DownloadsApi::openapi());
    root.merge(social::SocialApi::openapi());
    root
}

pub fn router() -> Router<Arc<AppState>> {
    let docs = get_docs();
    Router::new().route("/api-docs/openapi.json", get(move || async move { Json(docs) }))
}
