//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body of the
//! form `{"error": "..."}` with a matching status code.
//!
//! Internal errors are logged with full detail but only a generic message is
//! returned, so file paths and provider responses never reach clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docugen_core::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the generation store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid request, or the resource is not ready.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or wrong `X-API-Key`.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),

            ServerError::Store(StoreError::NotFound(id)) => {
                (StatusCode::NOT_FOUND, format!("Generation {id} not found"))
            }
            ServerError::Store(e) => {
                error!(error = %e, "store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        error!(error = ?e, "converting I/O error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
