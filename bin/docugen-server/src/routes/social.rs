//! Publishing a finished generation to social platforms on demand.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::routes::downloads::completed_record;
use crate::schemas::social::{UploadRequest, UploadResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(upload_to_social), components(schemas(UploadRequest, UploadResponse)))]
pub struct SocialApi;

/// Requires the API key when one is configured.
pub fn protected_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/upload-to-social", post(upload_to_social))
}

/// Upload synchronously and merge the results into the record.
#[utoipa::path(
    post,
    path = "/api/upload-to-social",
    tag = "social",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Per-platform results", body = UploadResponse),
        (status = 400, description = "Generation not completed or has no videos"),
        (status = 401, description = "Invalid API key"),
        (status = 404, description = "Generation not found"),
    )
)]
pub async fn upload_to_social(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ServerError> {
    let record = completed_record(&state, &req.generation_id).await?;
    if !record.has_video_files() {
        return Err(ServerError::BadRequest("No video files available for upload".into()));
    }

    info!(generation_id = %record.id, platforms = ?req.platforms, "manual social upload");
    let results = state.pipeline.publish(&record, &req.platforms).await?;
    Ok(Json(UploadResponse {
        generation_id: record.id,
        results,
    }))
}
