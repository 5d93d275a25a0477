//! Serving finished voiceovers and videos.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use docugen_core::media::ratio_from_url;
use docugen_core::{GenerationRecord, GenerationStore};
use tracing::warn;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(download_audio, download_video))]
pub struct DownloadsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/download/{id}", get(download_audio))
        .route("/api/download-video/{id}/{format}", get(download_video))
}

/// A completed record, or the matching 404 / 400.
pub(crate) async fn completed_record(
    state: &AppState,
    id: &str,
) -> Result<GenerationRecord, ServerError> {
    let record = state
        .pipeline
        .store()
        .get(id)
        .await?
        .ok_or_else(|| ServerError::NotFound("Generation not found".into()))?;
    if !record.is_completed() {
        return Err(ServerError::BadRequest("Generation not completed".into()));
    }
    Ok(record)
}

async fn attachment(path: &str, content_type: &'static str, filename: String) -> Result<Response, ServerError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path, "media file missing on disk");
            return Err(ServerError::NotFound("File not found".into()));
        }
        Err(e) => return Err(e.into()),
    };
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/api/download/{id}",
    tag = "downloads",
    params(("id" = String, Path, description = "Generation id")),
    responses(
        (status = 200, description = "Voiceover as an `audio/mpeg` attachment"),
        (status = 400, description = "Generation not completed"),
        (status = 404, description = "Generation or file not found"),
    )
)]
pub async fn download_audio(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ServerError> {
    let record = completed_record(&state, &id).await?;
    let path = record
        .audio_file
        .as_deref()
        .ok_or_else(|| ServerError::NotFound("Audio file not found".into()))?;
    attachment(path, "audio/mpeg", format!("documentary_{id}.mp3")).await
}

#[utoipa::path(
    get,
    path = "/api/download-video/{id}/{format}",
    tag = "downloads",
    params(
        ("id" = String, Path, description = "Generation id"),
        ("format" = String, Path, description = "Aspect ratio with `x`, e.g. `16x9`"),
    ),
    responses(
        (status = 200, description = "Video as a `video/mp4` attachment"),
        (status = 400, description = "Generation not completed"),
        (status = 404, description = "Generation, format or file not found"),
    )
)]
pub async fn download_video(
    State(state): State<Arc<AppState>>,
    Path((id, format)): Path<(String, String)>,
) -> Result<Response, ServerError> {
    let record = completed_record(&state, &id).await?;
    let ratio = ratio_from_url(&format);
    let path = record
        .video_path(&ratio)
        .ok_or_else(|| ServerError::NotFound(format!("Video file not found for format {ratio}")))?;
    attachment(path, "video/mp4", format!("documentary_{id}_{format}.mp4")).await
}
