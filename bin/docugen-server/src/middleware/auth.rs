use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ServerError;
use crate::state::AppState;

pub static X_API_KEY: &str = "x-api-key";

/// Reject requests whose `X-API-Key` does not match the configured key.
/// No-op when `DOCUGEN_API_KEY` is unset.
pub async fn check_api_key(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected) = state.config.api_key.as_deref() {
        let provided = req.headers().get(X_API_KEY).and_then(|v| v.to_str().ok());
        if provided != Some(expected) {
            return ServerError::Unauthorized("Invalid API key".into()).into_response();
        }
    }
    next.run(req).await
}
