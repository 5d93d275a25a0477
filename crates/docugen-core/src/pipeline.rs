//! The generation pipeline: script → voiceover → description → videos →
//! social uploads, run as one background task per generation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{PipelineError, StageError};
use crate::media::{compose_all, RenderJob, VideoRenderer};
use crate::providers::{SpeechSynthesizer, TextGenerator};
use crate::record::{GenerationRecord, SocialUploads, VideoFiles};
use crate::social::SocialPublisher;
use crate::store::{GenerationStore, MemoryStore, StoreError};

const SCRIPT_SYSTEM: &str = "You are a professional documentary scriptwriter.";
const SCRIPT_MAX_TOKENS: u32 = 1000;
const DESCRIPTION_SYSTEM: &str = "You are a video marketing expert.";
const DESCRIPTION_MAX_TOKENS: u32 = 100;

fn script_prompt(topic: &str, niche: &str) -> String {
    format!(
        "Create a compelling documentary script about {topic} in the {niche} niche. \
         The script should be engaging, informative, and suitable for a 2-3 minute video. \
         Include a strong opening hook, key facts, and a memorable conclusion. \
         Format as a narrative script without stage directions."
    )
}

fn description_prompt(topic: &str) -> String {
    format!(
        "Create a brief, engaging description for a documentary video about {topic}. \
         Keep it under 200 characters and make it compelling for viewers."
    )
}

/// What a client asks for. Defaults are applied at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub niche: String,
    pub aspect_ratios: Vec<String>,
    pub social_platforms: Vec<String>,
}

/// The external collaborators of a pipeline.
#[derive(Clone)]
pub struct Services {
    pub writer: Arc<dyn TextGenerator>,
    pub voice: Arc<dyn SpeechSynthesizer>,
    pub renderer: Arc<dyn VideoRenderer>,
    pub publisher: Arc<dyn SocialPublisher>,
}

/// Tracks in-flight generation tasks, keyed by generation id.
pub struct TaskManager {
    handles: std::sync::Mutex<HashMap<String, tokio::task::AbortHandle>>,
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.handles.lock().map(|h| h.len()).unwrap_or(0);
        write!(f, "TaskManager({count} handles)")
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskManager {
    pub fn new() -> Self {
        Self { handles: std::sync::Mutex::new(HashMap::new()) }
    }

    pub fn insert(&self, id: impl Into<String>, handle: tokio::task::AbortHandle) {
        if let Ok(mut map) = self.handles.lock() {
            map.insert(id.into(), handle);
        }
    }

    pub fn remove(&self, id: &str) {
        if let Ok(mut map) = self.handles.lock() {
            map.remove(id);
        }
    }

    /// Number of generations still running.
    ///
    /// A task can finish before its handle is inserted, so finished handles
    /// are pruned here.
    pub fn in_flight(&self) -> usize {
        match self.handles.lock() {
            Ok(mut map) => {
                map.retain(|_, handle| !handle.is_finished());
                map.len()
            }
            Err(_) => 0,
        }
    }
}

/// Runs generations against a shared store.
pub struct Pipeline<S = MemoryStore> {
    store: Arc<S>,
    services: Services,
    tasks: Arc<TaskManager>,
    media_dir: PathBuf,
}

impl<S> Clone for Pipeline<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            services: self.services.clone(),
            tasks: Arc::clone(&self.tasks),
            media_dir: self.media_dir.clone(),
        }
    }
}

impl<S: GenerationStore> Pipeline<S> {
    pub fn new(store: Arc<S>, services: Services, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            services,
            tasks: Arc::new(TaskManager::new()),
            media_dir: media_dir.into(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn tasks(&self) -> &Arc<TaskManager> {
        &self.tasks
    }

    /// Record a new generation and start it in the background.
    ///
    /// Returns the `generating` record immediately.
    pub async fn start(&self, request: GenerationRequest) -> Result<GenerationRecord, StoreError> {
        let record = GenerationRecord::new(
            request.topic,
            request.niche,
            request.aspect_ratios,
            request.social_platforms,
        );
        self.store.insert(record.clone()).await?;
        info!(
            generation_id = %record.id,
            topic = %record.topic,
            niche = %record.niche,
            "generation started"
        );

        let pipeline = self.clone();
        let id = record.id.clone();
        let handle = tokio::spawn(async move {
            // Inner task so a panic in any stage still marks the record failed.
            let worker = pipeline.clone();
            let run_id = id.clone();
            let outcome = match tokio::spawn(async move { worker.run(&run_id).await }).await {
                Ok(outcome) => outcome,
                Err(e) => Err(PipelineError::Task(e.to_string())),
            };
            pipeline.finish(&id, outcome).await;
            pipeline.tasks.remove(&id);
        });
        self.tasks.insert(record.id.clone(), handle.abort_handle());

        Ok(record)
    }

    async fn run(&self, id: &str) -> Result<(), PipelineError> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        let writer = &self.services.writer;

        info!(generation_id = %id, "generating script");
        let script = writer
            .generate(SCRIPT_SYSTEM, &script_prompt(&record.topic, &record.niche), SCRIPT_MAX_TOKENS)
            .await
            .map_err(StageError::Script)?;
        self.store.set_script(id, script.clone()).await?;

        info!(generation_id = %id, "generating voiceover");
        let audio_path = self.media_dir.join(format!("voiceover_{id}.mp3"));
        self.services
            .voice
            .synthesize(&script, &audio_path)
            .await
            .map_err(StageError::Voice)?;
        self.store
            .set_audio_file(id, audio_path.to_string_lossy().into_owned())
            .await?;

        info!(generation_id = %id, "generating description");
        let description = writer
            .generate(DESCRIPTION_SYSTEM, &description_prompt(&record.topic), DESCRIPTION_MAX_TOKENS)
            .await
            .map_err(StageError::Description)?;
        self.store.set_description(id, description.clone()).await?;

        if record.aspect_ratios.is_empty() {
            return Ok(());
        }

        info!(generation_id = %id, formats = ?record.aspect_ratios, "creating videos");
        let job = RenderJob {
            generation_id: id.to_owned(),
            topic: record.topic.clone(),
            script,
            audio_path,
        };
        let files: VideoFiles = compose_all(self.services.renderer.as_ref(), &job, &record.aspect_ratios)
            .await
            .into_iter()
            .map(|(ratio, path)| (ratio, path.map(|p| p.to_string_lossy().into_owned())))
            .collect();
        let any_video = files.values().any(Option::is_some);
        self.store.set_video_files(id, files.clone()).await?;

        if record.social_platforms.is_empty() {
            return Ok(());
        }
        if !any_video {
            warn!(generation_id = %id, "no videos produced, skipping social uploads");
            return Ok(());
        }

        info!(generation_id = %id, platforms = ?record.social_platforms, "uploading to social media");
        let uploads = self
            .services
            .publisher
            .publish(&files, &record.topic, &description, &record.social_platforms)
            .await;
        self.store.merge_social_uploads(id, uploads).await?;
        Ok(())
    }

    async fn finish(&self, id: &str, outcome: Result<(), PipelineError>) {
        let result = match outcome {
            Ok(()) => {
                info!(generation_id = %id, "generation completed");
                self.store.complete(id).await
            }
            Err(e) => {
                let kind = e.kind();
                error!(generation_id = %id, error = %e, error_type = %kind, "generation failed");
                self.store.fail(id, kind, e.user_message().to_owned()).await
            }
        };
        if let Err(e) = result {
            error!(generation_id = %id, error = %e, "failed to record generation outcome");
        }
    }

    /// Upload a finished generation's videos and merge the results into its
    /// record. Returns only this call's results.
    pub async fn publish(
        &self,
        record: &GenerationRecord,
        platforms: &[String],
    ) -> Result<SocialUploads, StoreError> {
        let files = record.video_files.clone().unwrap_or_default();
        let description = record.description.as_deref().unwrap_or_default();
        let uploads = self
            .services
            .publisher
            .publish(&files, &record.topic, description, platforms)
            .await;
        self.store.merge_social_uploads(&record.id, uploads.clone()).await?;
        Ok(uploads)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
