//! Media services: stock footage, placeholder images, preprocessing and the
//! ffmpeg-backed slideshow compositor.

pub mod compositor;
pub mod ffmpeg;
pub mod placeholder;
pub mod preprocess;
pub mod stock;
pub mod timeline;

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::error::ErrorKind;

pub use compositor::Compositor;
pub use stock::{extract_keywords, ImageSource, StockFootageClient};

/// One of the three supported output shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum AspectRatio {
    #[strum(to_string = "16:9")]
    Wide,
    #[strum(to_string = "9:16")]
    Tall,
    #[strum(to_string = "1:1")]
    Square,
}

impl AspectRatio {
    /// Output pixel size `(width, height)`.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            AspectRatio::Wide => (1920, 1080),
            AspectRatio::Tall => (1080, 1920),
            AspectRatio::Square => (1080, 1080),
        }
    }

    /// Label used in file names and URLs (`16x9`).
    pub fn file_label(self) -> String {
        self.to_string().replace(':', "x")
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::from_str(label).ok()
    }
}

/// Map a URL format segment (`16x9`) back to a ratio label (`16:9`).
pub fn ratio_from_url(format: &str) -> String {
    format.replace('x', ":")
}

/// Everything the compositor needs to render one generation.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub generation_id: String,
    pub topic: String,
    pub script: String,
    pub audio_path: PathBuf,
}

/// Renders a video for one aspect ratio.
///
/// Implementations log their own failures; `None` means the format could not
/// be produced.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    async fn render(&self, job: &RenderJob, aspect_ratio: &str) -> Option<PathBuf>;
}

/// Render every requested ratio independently.
///
/// A failure for one ratio is recorded as `None` and never affects another.
/// A panicking render counts as a failure of that ratio only.
pub async fn compose_all(
    renderer: &dyn VideoRenderer,
    job: &RenderJob,
    ratios: &[String],
) -> BTreeMap<String, Option<PathBuf>> {
    let mut results = BTreeMap::new();
    for ratio in ratios {
        let output = match AssertUnwindSafe(renderer.render(job, ratio))
            .catch_unwind()
            .await
        {
            Ok(output) => output,
            Err(panic) => {
                error!(
                    generation_id = %job.generation_id,
                    aspect_ratio = %ratio,
                    error_type = %ErrorKind::VideoProcessing,
                    panic = panic_message(panic.as_ref()),
                    "video renderer panicked"
                );
                None
            }
        };
        match &output {
            Some(path) => info!(
                generation_id = %job.generation_id,
                aspect_ratio = %ratio,
                path = %path.display(),
                "video created"
            ),
            None => warn!(
                generation_id = %job.generation_id,
                aspect_ratio = %ratio,
                "video creation failed for format"
            ),
        }
        results.insert(ratio.clone(), output);
    }
    results
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
