//! Error taxonomy for the generation pipeline.
//!
//! Every fatal stage produces a [`StageError`] that carries its
//! [`ErrorKind`] explicitly; the kind is never inferred from message text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// Classification stored in a failed record's `error_type` field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The text service failed while writing the script.
    ScriptGeneration,
    /// The speech service failed, or the audio could not be written.
    VoiceGeneration,
    /// The text service failed while writing the description.
    DescriptionGeneration,
    /// Compositing failed for a format. Recorded per format, never fatal.
    VideoProcessing,
    /// The stock-photo service failed. Always degrades to placeholders.
    ImageService,
    /// Anything not produced by a stage.
    General,
}

impl ErrorKind {
    /// Message shown to API clients; the raw error only goes to the logs.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::ScriptGeneration => {
                "Failed to generate the documentary script. Check the text generation service key and quota."
            }
            ErrorKind::VoiceGeneration => {
                "Failed to generate the voiceover. Check the speech synthesis service key and quota."
            }
            ErrorKind::DescriptionGeneration => {
                "Failed to generate the video description. Check the text generation service key and quota."
            }
            ErrorKind::VideoProcessing => "Video processing failed for one or more formats.",
            ErrorKind::ImageService => "Stock image service unavailable; placeholder images were used.",
            ErrorKind::General => "Video generation failed due to an unexpected error.",
        }
    }
}

/// Errors returned by the external text, speech and upload services.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The service key is not configured.
    #[error("{service} credential not configured (set {variable})")]
    MissingCredential {
        service: &'static str,
        variable: &'static str,
    },

    /// Transport failure (DNS, TLS, timeout, body decode).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The response parsed but lacked an expected field.
    #[error("invalid {service} response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    /// Writing the response to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fatal failure in one of the first three pipeline stages.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("script generation failed: {0}")]
    Script(#[source] ProviderError),

    #[error("voice generation failed: {0}")]
    Voice(#[source] ProviderError),

    #[error("description generation failed: {0}")]
    Description(#[source] ProviderError),
}

impl StageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StageError::Script(_) => ErrorKind::ScriptGeneration,
            StageError::Voice(_) => ErrorKind::VoiceGeneration,
            StageError::Description(_) => ErrorKind::DescriptionGeneration,
        }
    }
}

/// Why a background generation routine aborted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The routine panicked or was aborted.
    #[error("generation task ended abnormally: {0}")]
    Task(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Stage(e) => e.kind(),
            PipelineError::Store(_) | PipelineError::Task(_) => ErrorKind::General,
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }
}

/// Failures inside the media services. These never leave the compositor:
/// they are logged and turned into a missing result.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("ffmpeg error: {0}")]
    Ffmpeg(#[from] anyhow::Error),

    #[error("unsupported aspect ratio: {0}")]
    UnsupportedAspectRatio(String),

    #[error("no usable images for video creation")]
    NoImages,

    #[error("invalid audio duration: {0}")]
    InvalidDuration(String),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// ── Tests ──────────────────────────────────────────────────────────────────────
