//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - API-key protection for the generate and upload routes
//! - Optional OpenAPI document (disable with `DOCUGEN_ENABLE_DOCS=false`)

pub mod doc;
mod downloads;
mod generations;
mod health;
mod social;

use std::sync::Arc;

use axum::{middleware, Router};

use crate::middleware::{auth, cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .merge(generations::protected_router())
        .merge(social::protected_router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::check_api_key,
        ));

    let mut app = Router::new()
        .merge(health::router())
        .merge(generations::router())
        .merge(downloads::router())
        .merge(protected);

    if state.config.enable_docs {
        app = app.merge(doc::router());
    }

    app
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer(&state))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use docugen_core::media::{RenderJob, VideoRenderer};
    use docugen_core::providers::{SpeechSynthesizer, TextGenerator};
    use docugen_core::{
        GenerationRecord, GenerationStore, ProviderError, Services, SocialPublisher,
        SocialUploads, UploadResult, VideoFiles,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    struct Offline;

    #[async_trait]
    impl TextGenerator for Offline {
        async fn generate(&self, _: &str, _: &str, _: u32) -> Result<String, ProviderError> {
            Err(ProviderError::MissingCredential {
                service: "OpenAI",
                variable: "OPENAI_API_KEY",
            })
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for Offline {
        async fn synthesize(&self, _: &str, _: &Path) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    #[async_trait]
    impl VideoRenderer for Offline {
        async fn render(&self, _: &RenderJob, _: &str) -> Option<PathBuf> {
            None
        }
    }

    #[async_trait]
    impl SocialPublisher for Offline {
        async fn publish(&self, _: &VideoFiles, _: &str, _: &str, platforms: &[String]) -> SocialUploads {
            platforms
                .iter()
                .map(|p| (p.clone(), UploadResult::pending("queued")))
                .collect()
        }
    }

    fn state_with(config: Config) -> Arc<AppState> {
        let offline = Arc::new(Offline);
        let services = Services {
            writer: offline.clone(),
            voice: offline.clone(),
            renderer: offline.clone(),
            publisher: offline,
        };
        Arc::new(AppState::with_services(config, services))
    }

    fn state() -> Arc<AppState> {
        state_with(Config::default())
    }

    async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, Vec<u8>, header::HeaderMap) {
        let response = build(state.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body, headers)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_body(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    /// A completed record whose media files live in a scratch directory.
    async fn completed(state: &Arc<AppState>, with_wide_video: bool) -> (GenerationRecord, PathBuf) {
        let dir = std::env::temp_dir().join(format!("routes_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let store = state.pipeline.store();
        let record = GenerationRecord::new("Glaciers", "nature", vec!["16:9".into(), "9:16".into()], vec![]);
        store.insert(record.clone()).await.unwrap();

        let audio = dir.join(format!("voiceover_{}.mp3", record.id));
        std::fs::write(&audio, b"ID3 audio").unwrap();
        store.set_audio_file(&record.id, audio.to_string_lossy().into_owned()).await.unwrap();

        let wide = with_wide_video.then(|| {
            let video = dir.join(format!("video_{}_16x9.mp4", record.id));
            std::fs::write(&video, b"mp4 bytes").unwrap();
            video.to_string_lossy().into_owned()
        });
        store
            .set_video_files(
                &record.id,
                VideoFiles::from([("16:9".to_owned(), wide), ("9:16".to_owned(), None)]),
            )
            .await
            .unwrap();
        store.complete(&record.id).await.unwrap();
        (store.get(&record.id).await.unwrap().unwrap(), dir)
    }

    #[tokio::test]
    async fn healthz_reports_version_and_in_flight() {
        let (status, body, _) = send(&state(), get("/healthz")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["in_flight"], 0);
    }

    #[tokio::test]
    async fn generate_returns_generating_record() {
        let state = state();
        let (status, body, _) = send(
            &state,
            post_json("/api/generate-video", json!({"topic": "Glaciers", "niche": "nature"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["status"], "generating");
        assert_eq!(body["aspect_ratios"], json!(["16:9", "9:16", "1:1"]));
        assert!(body.get("error").is_none());
        let id = body["id"].as_str().unwrap();
        assert!(state.pipeline.store().get(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn generate_rejects_blank_fields() {
        let (status, body, _) = send(
            &state(),
            post_json("/api/generate-video", json!({"topic": "", "niche": "nature"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["error"], "Topic and niche are required");
    }

    #[tokio::test]
    async fn api_key_guards_generate_and_upload_only() {
        let state = state_with(Config {
            api_key: Some("secret".into()),
            ..Config::default()
        });

        let (status, _, _) = send(
            &state,
            post_json("/api/generate-video", json!({"topic": "A", "niche": "B"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(
            &state,
            post_json("/api/upload-to-social", json!({"generation_id": "x", "platforms": []})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut req = post_json("/api/generate-video", json!({"topic": "A", "niche": "B"}));
        req.headers_mut().insert(auth::X_API_KEY, "secret".parse().unwrap());
        let (status, _, _) = send(&state, req).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = send(&state, get("/api/generations")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let state = state();
        let store = state.pipeline.store();
        let first = GenerationRecord::new("First", "n", vec![], vec![]);
        let second = GenerationRecord::new("Second", "n", vec![], vec![]);
        store.insert(first.clone()).await.unwrap();
        store.insert(second.clone()).await.unwrap();

        let (status, body, _) = send(&state, get("/api/generations")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["generations"][0]["id"], second.id.as_str());
        assert_eq!(body["generations"][1]["id"], first.id.as_str());
    }

    #[tokio::test]
    async fn downloads_of_unknown_generation_are_not_found() {
        let state = state();
        let (status, _, _) = send(&state, get("/api/download/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = send(&state, get("/api/download-video/nope/16x9")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn downloads_wait_for_completion() {
        let state = state();
        let record = GenerationRecord::new("Glaciers", "nature", vec![], vec![]);
        state.pipeline.store().insert(record.clone()).await.unwrap();

        let (status, body, _) = send(&state, get(&format!("/api/download/{}", record.id))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["error"], "Generation not completed");
    }

    #[tokio::test]
    async fn audio_download_is_an_mpeg_attachment() {
        let state = state();
        let (record, dir) = completed(&state, true).await;

        let (status, body, headers) = send(&state, get(&format!("/api/download/{}", record.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
        assert!(headers[header::CONTENT_DISPOSITION].to_str().unwrap().starts_with("attachment;"));
        assert_eq!(body, b"ID3 audio");
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn video_download_by_format() {
        let state = state();
        let (record, dir) = completed(&state, true).await;

        let (status, body, headers) =
            send(&state, get(&format!("/api/download-video/{}/16x9", record.id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(body, b"mp4 bytes");

        // Failed format and never-requested format.
        for format in ["9x16", "1x1"] {
            let (status, _, _) =
                send(&state, get(&format!("/api/download-video/{}/{format}", record.id))).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn missing_file_on_disk_is_not_found() {
        let state = state();
        let (record, dir) = completed(&state, true).await;
        std::fs::remove_dir_all(&dir).unwrap();

        let (status, _, _) = send(&state, get(&format!("/api/download/{}", record.id))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_requires_a_video() {
        let state = state();
        let (record, dir) = completed(&state, false).await;

        let (status, body, _) = send(
            &state,
            post_json(
                "/api/upload-to-social",
                json!({"generation_id": record.id, "platforms": ["youtube"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(&body)["error"], "No video files available for upload");
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn upload_merges_results_into_record() {
        let state = state();
        let (record, dir) = completed(&state, true).await;

        let (status, body, _) = send(
            &state,
            post_json(
                "/api/upload-to-social",
                json!({"generation_id": record.id, "platforms": ["youtube", "tiktok"]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(&body);
        assert_eq!(body["generation_id"], record.id.as_str());
        assert_eq!(body["results"]["youtube"]["status"], "pending");

        let stored = state.pipeline.store().get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.social_uploads.unwrap().len(), 2);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn upload_for_unknown_generation_is_not_found() {
        let (status, _, _) = send(
            &state(),
            post_json("/api/upload-to-social", json!({"generation_id": "nope", "platforms": []})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn openapi_document_can_be_disabled() {
        let (status, body, _) = send(&state(), get("/api-docs/openapi.json")).await;
        assert_eq!(status, StatusCode::OK);
        let doc = json_body(&body);
        assert!(doc["paths"]["/api/generate-video"].is_object());
        assert!(doc["paths"]["/api/download-video/{id}/{format}"].is_object());

        let state = state_with(Config {
            enable_docs: false,
            ..Config::default()
        });
        let (status, _, _) = send(&state, get("/api-docs/openapi.json")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
