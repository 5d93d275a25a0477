//! Slideshow compositor: stock images + voiceover → one encoded video per
//! aspect ratio.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ffmpeg_sidecar::command::FfmpegCommand;
use tracing::{debug, error, info, warn};

use super::stock::{extract_keywords, StockFootageClient};
use super::timeline::{self, Slot};
use super::{ffmpeg, preprocess, AspectRatio, RenderJob, VideoRenderer};
use crate::error::{ErrorKind, MediaError};

/// Candidate images requested per video.
pub const IMAGE_COUNT: usize = 8;
pub const FRAME_RATE: u32 = 24;
const AUDIO_BITRATE: &str = "192k";

pub struct Compositor {
    stock: StockFootageClient,
    media_dir: PathBuf,
}

impl Compositor {
    pub fn new(stock: StockFootageClient, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            stock,
            media_dir: media_dir.into(),
        }
    }

    /// Final location of the `ratio` video for a generation.
    pub fn output_path(&self, generation_id: &str, ratio: AspectRatio) -> PathBuf {
        self.media_dir
            .join(format!("video_{generation_id}_{}.mp4", ratio.file_label()))
    }

    async fn compose(
        &self,
        job: &RenderJob,
        ratio: AspectRatio,
        scratch: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, MediaError> {
        let tag = format!("{}_{}", job.generation_id, ratio.file_label());

        let keywords = extract_keywords(&job.script, &job.topic);
        debug!(generation_id = %job.generation_id, ?keywords, "searching stock images");
        let sources = self.stock.fetch(&keywords, IMAGE_COUNT).await;

        let mut images = Vec::with_capacity(sources.len());
        for source in &sources {
            if let Some(path) = self.stock.download(source, &self.media_dir, &tag).await {
                scratch.push(path.clone());
                images.push(path);
            }
        }
        if images.is_empty() {
            return Err(MediaError::NoImages);
        }

        let duration = ffmpeg::probe_duration(&job.audio_path).await?;
        let (width, height) = ratio.dimensions();

        let mut frames = Vec::with_capacity(images.len());
        for image in &images {
            if let Some(path) = preprocess::normalize(image, width, height).await {
                scratch.push(path.clone());
                frames.push(path);
            }
        }
        if frames.is_empty() {
            return Err(MediaError::NoImages);
        }
        frames.truncate(timeline::max_slots(duration, FRAME_RATE));

        let slots = timeline::build(duration, frames.len());
        let temp_audio = self.media_dir.join(format!("temp_audio_{tag}.m4a"));
        scratch.push(temp_audio.clone());
        let output = self.output_path(&job.generation_id, ratio);

        info!(
            generation_id = %job.generation_id,
            aspect_ratio = %ratio,
            images = frames.len(),
            duration,
            "encoding video"
        );

        let audio_args = transcode_audio_args(&job.audio_path, &temp_audio);
        let video_args = encode_args(&frames, &slots, &temp_audio, &output, (width, height), duration);
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            ffmpeg::run(
                FfmpegCommand::new().hide_banner().overwrite().args(&audio_args),
                "audio transcode",
            )?;
            ffmpeg::run(
                FfmpegCommand::new().hide_banner().overwrite().args(&video_args),
                "video encode",
            )
        })
        .await??;

        Ok(output)
    }
}

#[async_trait]
impl VideoRenderer for Compositor {
    async fn render(&self, job: &RenderJob, aspect_ratio: &str) -> Option<PathBuf> {
        let Some(ratio) = AspectRatio::parse(aspect_ratio) else {
            error!(
                generation_id = %job.generation_id,
                error = %MediaError::UnsupportedAspectRatio(aspect_ratio.to_owned()),
                error_type = %ErrorKind::VideoProcessing,
                "error creating video"
            );
            return None;
        };

        let mut scratch = Vec::new();
        let result = self.compose(job, ratio, &mut scratch).await;
        cleanup(&scratch).await;

        match result {
            Ok(path) => Some(path),
            Err(e) => {
                error!(
                    generation_id = %job.generation_id,
                    aspect_ratio = %ratio,
                    error = %e,
                    error_type = %ErrorKind::VideoProcessing,
                    "error creating video"
                );
                None
            }
        }
    }
}

/// Delete every intermediate file; one failure never stops the rest.
async fn cleanup(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove intermediate file"),
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn transcode_audio_args(audio: &Path, dest: &Path) -> Vec<String> {
    vec![
        "-i".into(),
        path_arg(audio),
        "-vn".into(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        AUDIO_BITRATE.into(),
        path_arg(dest),
    ]
}

fn frames_to_secs(frames: u64) -> f64 {
    frames as f64 / f64::from(FRAME_RATE)
}

/// Per-slot video chain: fit into the frame, cut to exactly `frames` frames,
/// then apply the slot's fades. Fade offsets are relative to the slot, since
/// each input starts at zero.
fn slot_filter(index: usize, slot: &Slot, frames: u64, (width, height): (u32, u32)) -> String {
    let mut chain = format!(
        "[{index}:v]scale={width}:{height}:force_original_aspect_ratio=decrease,\
         pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setsar=1,format=yuv420p,trim=end_frame={frames}"
    );
    let length = frames_to_secs(frames);
    if slot.fade_in > 0.0 {
        chain.push_str(&format!(",fade=t=in:st=0:d={:.3}", slot.fade_in.min(length / 2.0)));
    }
    if slot.fade_out > 0.0 {
        let fade = slot.fade_out.min(length / 2.0);
        chain.push_str(&format!(",fade=t=out:st={:.3}:d={fade:.3}", length - fade));
    }
    chain.push_str(&format!("[v{index}]"));
    chain
}

/// Inputs already run at the output rate, so a single `fps` after `concat`
/// only pins the stream's rate and never drops or repeats a frame.
fn filter_graph(slots: &[Slot], frames: &[u64], size: (u32, u32)) -> String {
    let mut parts: Vec<String> = slots
        .iter()
        .zip(frames)
        .enumerate()
        .map(|(i, (slot, &n))| slot_filter(i, slot, n, size))
        .collect();
    let labels: String = (0..slots.len()).map(|i| format!("[v{i}]")).collect();
    parts.push(format!(
        "{labels}concat=n={}:v=1:a=0,fps={FRAME_RATE}[outv]",
        slots.len()
    ));
    parts.join(";")
}

fn encode_args(
    frames: &[PathBuf],
    slots: &[Slot],
    audio: &Path,
    output: &Path,
    size: (u32, u32),
    duration: f64,
) -> Vec<String> {
    let counts = timeline::frame_counts(slots, FRAME_RATE);
    let mut args = Vec::new();
    for (frame, &count) in frames.iter().zip(&counts) {
        // One spare frame of input; `trim` makes the exact cut.
        args.extend([
            "-loop".into(),
            "1".into(),
            "-framerate".into(),
            FRAME_RATE.to_string(),
            "-t".into(),
            format!("{:.3}", frames_to_secs(count + 1)),
            "-i".into(),
            path_arg(frame),
        ]);
    }
    args.extend(["-i".into(), path_arg(audio)]);
    args.extend([
        "-filter_complex".into(),
        filter_graph(slots, &counts, size),
        "-map".into(),
        "[outv]".into(),
        "-map".into(),
        format!("{}:a", slots.len()),
        "-t".into(),
        format!("{duration:.3}"),
        "-r".into(),
        FRAME_RATE.to_string(),
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-c:a".into(),
        "aac".into(),
        path_arg(output),
    ]);
    args
}

// ── Tests ──────────────────────────────────────────────────────────────────────
