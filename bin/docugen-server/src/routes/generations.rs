//! Starting generations and listing their records.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use docugen_core::{GenerationRecord, GenerationRequest, GenerationStore};
use serde_json::Value;
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::generation::{GenerateVideoRequest, GenerationList};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_generations, generate_video),
    components(schemas(GenerateVideoRequest, GenerationList))
)]
pub struct GenerationsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/generations", get(list_generations))
}

/// Routes that require the API key when one is configured.
pub fn protected_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/generate-video", post(generate_video))
}

#[utoipa::path(
    get,
    path = "/api/generations",
    tag = "generations",
    responses(
        (status = 200, description = "All generations, newest first", body = GenerationList),
        (status = 500, description = "Store error"),
    )
)]
pub async fn list_generations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GenerationList>, ServerError> {
    let generations = state.pipeline.store().list().await?;
    Ok(Json(GenerationList { generations }))
}

/// Start a generation; the returned record is still `generating`.
#[utoipa::path(
    post,
    path = "/api/generate-video",
    tag = "generations",
    request_body = GenerateVideoRequest,
    responses(
        (status = 200, description = "Generation started", body = Value),
        (status = 400, description = "Topic or niche missing"),
        (status = 401, description = "Invalid API key"),
        (status = 500, description = "Generation could not be started"),
    )
)]
pub async fn generate_video(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateVideoRequest>,
) -> Result<Json<GenerationRecord>, ServerError> {
    let request = GenerationRequest::try_from(req)?;
    let record = state.pipeline.start(request).await?;
    info!(generation_id = %record.id, "generation accepted");
    Ok(Json(record))
}
