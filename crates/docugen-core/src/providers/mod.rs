//! Clients for the external text-generation and speech-synthesis services.

pub mod elevenlabs;
pub mod openai;

use std::path::Path;

use async_trait::async_trait;

use crate::error::ProviderError;

pub use elevenlabs::ElevenLabsClient;
pub use openai::OpenAiClient;

/// A chat-style text generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt` under the given system role and return the text of
    /// the first choice.
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ProviderError>;
}

/// A text-to-speech service.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Voice `text` and stream the encoded audio into `dest`.
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<(), ProviderError>;
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("docugen/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Turn a non-success response into [`ProviderError::Status`].
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        service,
        status: status.as_u16(),
        body,
    })
}
