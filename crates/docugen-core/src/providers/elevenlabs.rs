//! ElevenLabs text-to-speech client.

use std::path::Path;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{ensure_success, http_client, SpeechSynthesizer};
use crate::error::ProviderError;

pub const DEFAULT_VOICE_ID: &str = "JBFqnCBsd6RMkjVDRZzb";
pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const MODEL_ID: &str = "eleven_multilingual_v2";
pub const OUTPUT_FORMAT: &str = "mp3_44100_128";

const SERVICE: &str = "ElevenLabs";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    client: reqwest::Client,
    api_key: Option<String>,
    voice_id: String,
    base_url: String,
}

impl ElevenLabsClient {
    pub fn new(
        api_key: Option<String>,
        voice_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: http_client(),
            api_key,
            voice_id: voice_id.into(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> Result<reqwest::Url, ProviderError> {
        let url = format!(
            "{}/text-to-speech/{}",
            self.base_url.trim_end_matches('/'),
            self.voice_id
        );
        reqwest::Url::parse_with_params(&url, [("output_format", OUTPUT_FORMAT)]).map_err(|e| {
            ProviderError::InvalidResponse {
                service: SERVICE,
                message: format!("invalid endpoint {url}: {e}"),
            }
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<(), ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential {
                service: SERVICE,
                variable: "ELEVENLABS_API_KEY",
            })?;

        let response = self
            .client
            .post(self.endpoint()?)
            .header("xi-api-key", api_key)
            .json(&SpeechRequest { text, model_id: MODEL_ID })
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        info!(path = %dest.display(), bytes = written, "voiceover written");
        Ok(())
    }
}
