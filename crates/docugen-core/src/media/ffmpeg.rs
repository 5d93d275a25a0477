//! Thin wrappers around the `ffmpeg` / `ffprobe` executables.

use std::path::Path;

use anyhow::{bail, Context};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::MediaError;

/// Run a prepared ffmpeg command to completion on the current thread.
///
/// Blocking; call from `spawn_blocking`. Fails when ffmpeg cannot be spawned
/// or exits unsuccessfully.
pub fn run(command: &mut FfmpegCommand, label: &str) -> anyhow::Result<()> {
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to spawn ffmpeg for {label}"))?;

    let mut last_error = None;
    for event in child.iter()? {
        match event {
            FfmpegEvent::Log(level, msg) => debug!("[FFmpeg {:?}] {}", level, msg),
            FfmpegEvent::Error(e) => {
                warn!(task = label, "FFmpeg error: {}", e);
                last_error = Some(e);
            }
            FfmpegEvent::Done => debug!(task = label, "FFmpeg finished"),
            _ => {}
        }
    }

    let status = child.wait()?;
    if !status.success() {
        bail!(
            "ffmpeg {label} exited with {status}: {}",
            last_error.unwrap_or_else(|| "no error output".into())
        );
    }
    Ok(())
}

/// Media duration in seconds, read with ffprobe.
pub async fn probe_duration(path: &Path) -> Result<f64, MediaError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::InvalidDuration(format!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_duration(&stdout)
}

fn parse_duration(raw: &str) -> Result<f64, MediaError> {
    let duration: f64 = raw
        .trim()
        .parse()
        .map_err(|e| MediaError::InvalidDuration(format!("cannot parse {:?}: {e}", raw.trim())))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::InvalidDuration(format!("{duration}")));
    }
    Ok(duration)
}
