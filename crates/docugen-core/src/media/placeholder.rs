//! Solid-colour labelled images used when no stock photo is available.

use std::path::{Path, PathBuf};

use ffmpeg_sidecar::command::FfmpegCommand;
use image::{Rgb, RgbImage};
use tracing::{debug, warn};

use super::ffmpeg;
use crate::error::MediaError;

pub const WIDTH: u32 = 1920;
pub const HEIGHT: u32 = 1080;
pub const FONT_SIZE: u32 = 60;
pub const PREFERRED_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

pub const PALETTE: [[u8; 3]; 5] = [
    [52, 152, 219],
    [155, 89, 182],
    [46, 204, 113],
    [241, 196, 15],
    [231, 76, 60],
];

/// Palette colour for the `index`-th placeholder.
pub fn palette_color(index: usize) -> [u8; 3] {
    PALETTE[index % PALETTE.len()]
}

/// Upper-case the first letter of every word, lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Render a placeholder to `dest` and return its path.
///
/// The solid image is always written; the centred label is drawn on top when
/// ffmpeg's text renderer is available and skipped otherwise.
pub async fn synthesize(
    color: [u8; 3],
    keyword: &str,
    dest: &Path,
) -> Result<PathBuf, MediaError> {
    let dest = dest.to_path_buf();
    let label = title_case(keyword);
    tokio::task::spawn_blocking(move || -> Result<PathBuf, MediaError> {
        RgbImage::from_pixel(WIDTH, HEIGHT, Rgb(color)).save(&dest)?;
        if let Err(e) = draw_label(&dest, &label) {
            warn!(path = %dest.display(), error = %e, "placeholder label skipped");
        }
        Ok(dest)
    })
    .await?
}

/// Text for ffmpeg's `drawtext` with everything but letters, digits, spaces
/// and hyphens removed; the filter syntax treats most punctuation specially.
fn drawtext_safe(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect::<String>()
        .trim()
        .to_owned()
}

fn drawtext_filter(label: &str, font: Option<&str>) -> String {
    let font = font.map(|f| format!("fontfile={f}:")).unwrap_or_default();
    format!(
        "drawtext={font}text='{}':fontcolor=white:fontsize={FONT_SIZE}:x=(w-text_w)/2:y=(h-text_h)/2",
        drawtext_safe(label)
    )
}

fn draw_label(path: &Path, label: &str) -> anyhow::Result<()> {
    if drawtext_safe(label).is_empty() {
        return Ok(());
    }
    let font = Path::new(PREFERRED_FONT).exists().then_some(PREFERRED_FONT);
    if font.is_none() {
        debug!(font = PREFERRED_FONT, "preferred font missing; using ffmpeg default");
    }

    let labelled = path.with_extension("labelled.jpg");
    let filter = drawtext_filter(label, font);
    let mut command = FfmpegCommand::new();
    command
        .hide_banner()
        .overwrite()
        .input(&*path.to_string_lossy())
        .args(["-vf", filter.as_str()])
        .args(["-frames:v", "1", "-q:v", "2"])
        .output(&*labelled.to_string_lossy());

    if let Err(e) = ffmpeg::run(&mut command, "placeholder label") {
        let _ = std::fs::remove_file(&labelled);
        return Err(e);
    }
    std::fs::rename(&labelled, path)?;
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
