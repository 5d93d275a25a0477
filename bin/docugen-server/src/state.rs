//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use docugen_core::media::{Compositor, StockFootageClient};
use docugen_core::providers::{ElevenLabsClient, OpenAiClient};
use docugen_core::{MemoryStore, Pipeline, Services, SocialUploader};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Runs generations; owns the record store and task handles.
    pub pipeline: Pipeline,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("tasks", self.pipeline.tasks())
            .finish()
    }
}

impl AppState {
    /// Wire the production service clients from `config`.
    pub fn from_config(config: Config) -> Self {
        let services = Services {
            writer: Arc::new(OpenAiClient::new(
                config.openai_api_key.clone(),
                config.openai_model.clone(),
                config.openai_base_url.clone(),
            )),
            voice: Arc::new(ElevenLabsClient::new(
                config.elevenlabs_api_key.clone(),
                config.elevenlabs_voice_id.clone(),
                docugen_core::providers::elevenlabs::DEFAULT_BASE_URL,
            )),
            renderer: Arc::new(Compositor::new(
                StockFootageClient::new(config.pexels_api_key.clone()),
                config.media_dir.clone(),
            )),
            publisher: Arc::new(SocialUploader::new(config.social.clone())),
        };
        Self::with_services(config, services)
    }

    pub fn with_services(config: Config, services: Services) -> Self {
        let pipeline = Pipeline::new(Arc::new(MemoryStore::new()), services, config.media_dir.clone());
        Self {
            config: Arc::new(config),
            pipeline,
        }
    }
}
