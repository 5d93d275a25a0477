//! Normalize images to the compositor's frame size.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::error;

use crate::error::MediaError;

pub const JPEG_QUALITY: u8 = 95;

/// Path the normalized copy of `path` is written to.
pub fn processed_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.jpg".to_owned());
    path.with_file_name(format!("processed_{name}"))
}

/// Convert to RGB, resize to exactly `width`×`height` (Lanczos3) and
/// re-encode as a quality-95 JPEG next to the source.
///
/// Returns `None` (and logs) when the image cannot be read or written; the
/// caller skips that image.
pub async fn normalize(path: &Path, width: u32, height: u32) -> Option<PathBuf> {
    let source = path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || normalize_blocking(&source, width, height))
        .await
        .map_err(MediaError::from)
        .and_then(|r| r);

    match result {
        Ok(out) => Some(out),
        Err(e) => {
            error!(path = %path.display(), error = %e, "error preprocessing image");
            None
        }
    }
}

fn normalize_blocking(path: &Path, width: u32, height: u32) -> Result<PathBuf, MediaError> {
    let rgb = image::open(path)?.into_rgb8();
    let resized = image::imageops::resize(&rgb, width, height, FilterType::Lanczos3);

    let out = processed_path(path);
    if let Err(e) = write_jpeg(&out, &resized) {
        // Never leave a truncated frame behind for the encoder to pick up.
        std::fs::remove_file(&out).ok();
        return Err(e);
    }
    Ok(out)
}

fn write_jpeg(out: &Path, image: &image::RgbImage) -> Result<(), MediaError> {
    let mut writer = BufWriter::new(File::create(out)?);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(image)?;
    writer.flush()?;
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
