//! docugen-core – documentary generation pipeline.
//!
//! A generation takes a topic and a niche and walks it through five stages:
//!
//! 1. **script** – a narrative documentary script from the text service.
//! 2. **speech** – the script voiced by the speech service into an mp3.
//! 3. **description** – a short marketing blurb from the text service.
//! 4. **video** – one slideshow per requested aspect ratio, built from stock
//!    photos (or synthesized placeholders) and encoded with ffmpeg.
//! 5. **upload** – the videos pushed to the requested social platforms.
//!
//! Stages 1–3 are fatal on failure; stages 4–5 record per-item results.
//! Progress is tracked in a [`GenerationRecord`] held by a [`MemoryStore`].

pub mod error;
pub mod media;
pub mod pipeline;
pub mod providers;
pub mod record;
pub mod social;
pub mod store;

pub use error::{ErrorKind, MediaError, PipelineError, ProviderError, StageError};
pub use pipeline::{GenerationRequest, Pipeline, Services, TaskManager};
pub use record::{GenerationRecord, GenerationStatus, SocialUploads, VideoFiles, DEFAULT_ASPECT_RATIOS};
pub use social::{Platform, SocialCredentials, SocialPublisher, SocialUploader, UploadResult, UploadStatus};
pub use store::{GenerationStore, MemoryStore, StoreError};
