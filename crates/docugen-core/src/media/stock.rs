//! Stock footage from the Pexels photo search API, with synthesized
//! placeholders whenever the service is unavailable.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use regex::Regex;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::placeholder;
use crate::error::{ErrorKind, ProviderError};
use crate::providers::{ensure_success, http_client};

pub const DEFAULT_SEARCH_URL: &str = "https://api.pexels.com/v1/search";

const SERVICE: &str = "Pexels";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_QUERIED_KEYWORDS: usize = 3;
const MAX_PER_PAGE: usize = 15;
const MAX_KEYWORDS: usize = 8;
const MAX_SCRIPT_KEYWORDS: usize = 5;
const MAX_COMMON_KEYWORDS: usize = 3;
const COMMON_WORDS: [&str; 6] = ["business", "technology", "nature", "people", "city", "office"];
const FALLBACK_COLOR: [u8; 3] = [100, 100, 100];

static CAPITALIZED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("static regex is valid"));

/// Search keywords for a script: the topic, up to five capitalised words
/// from the script and up to three generic words. Deduplicated, at most
/// eight, topic always first.
pub fn extract_keywords(script: &str, topic: &str) -> Vec<String> {
    let candidates = std::iter::once(topic)
        .chain(
            CAPITALIZED_WORD
                .find_iter(script)
                .map(|m| m.as_str())
                .take(MAX_SCRIPT_KEYWORDS),
        )
        .chain(COMMON_WORDS.iter().copied().take(MAX_COMMON_KEYWORDS));

    let mut seen = HashSet::new();
    candidates
        .filter(|word| seen.insert(*word))
        .take(MAX_KEYWORDS)
        .map(str::to_owned)
        .collect()
}

/// A candidate image: a photo to download, or a placeholder to synthesize.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Remote {
        id: String,
        url: String,
        keyword: String,
    },
    Placeholder {
        index: usize,
        keyword: String,
        color: [u8; 3],
    },
}

impl ImageSource {
    pub fn id(&self) -> String {
        match self {
            ImageSource::Remote { id, .. } => id.clone(),
            ImageSource::Placeholder { index, .. } => format!("placeholder_{index}"),
        }
    }

    pub fn keyword(&self) -> &str {
        match self {
            ImageSource::Remote { keyword, .. } | ImageSource::Placeholder { keyword, .. } => keyword,
        }
    }
}

/// `count` placeholder descriptors cycling through the palette.
pub fn placeholders(count: usize) -> Vec<ImageSource> {
    (0..count)
        .map(|index| ImageSource::Placeholder {
            index,
            keyword: "placeholder".into(),
            color: placeholder::palette_color(index),
        })
        .collect()
}

/// Page size per keyword so that `queried` searches cover `count` results.
pub fn per_page(count: usize, queried: usize) -> usize {
    (count / queried.max(1) + 1).min(MAX_PER_PAGE)
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    id: u64,
    src: PhotoSources,
}

#[derive(Debug, Deserialize)]
struct PhotoSources {
    large: String,
}

#[derive(Debug, Clone)]
pub struct StockFootageClient {
    client: reqwest::Client,
    api_key: Option<String>,
    search_url: String,
}

impl StockFootageClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_search_url(api_key, DEFAULT_SEARCH_URL)
    }

    pub fn with_search_url(api_key: Option<String>, search_url: impl Into<String>) -> Self {
        Self {
            client: http_client(),
            api_key,
            search_url: search_url.into(),
        }
    }

    /// Up to `count` images for `keywords`.
    ///
    /// Only the first three keywords are searched. Search failures are
    /// logged and skipped; with no key or no results the caller gets
    /// placeholders instead.
    pub async fn fetch(&self, keywords: &[String], count: usize) -> Vec<ImageSource> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Pexels API key not found, using placeholder images");
            return placeholders(count);
        };

        let queried = &keywords[..keywords.len().min(MAX_QUERIED_KEYWORDS)];
        let page_size = per_page(count, queried.len());
        let mut images = Vec::with_capacity(count);

        for keyword in queried {
            match self.search(api_key, keyword, page_size).await {
                Ok(photos) => {
                    for photo in photos {
                        images.push(ImageSource::Remote {
                            id: photo.id.to_string(),
                            url: photo.src.large,
                            keyword: keyword.clone(),
                        });
                        if images.len() >= count {
                            break;
                        }
                    }
                }
                Err(e) => error!(
                    keyword = %keyword,
                    error = %e,
                    error_type = %ErrorKind::ImageService,
                    "error fetching images for keyword"
                ),
            }
            if images.len() >= count {
                break;
            }
        }

        if images.is_empty() {
            warn!("no stock images found, using placeholder images");
            return placeholders(count);
        }
        images.truncate(count);
        info!(count = images.len(), "stock images selected");
        images
    }

    async fn search(
        &self,
        api_key: &str,
        keyword: &str,
        page_size: usize,
    ) -> Result<Vec<Photo>, ProviderError> {
        let page_size = page_size.to_string();
        let url = reqwest::Url::parse_with_params(
            &self.search_url,
            [
                ("query", keyword),
                ("per_page", page_size.as_str()),
                ("orientation", "landscape"),
            ],
        )
        .map_err(|e| ProviderError::InvalidResponse {
            service: SERVICE,
            message: format!("invalid search url: {e}"),
        })?;

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, api_key)
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;
        let body: SearchResponse = ensure_success(SERVICE, response).await?.json().await?;
        Ok(body.photos)
    }

    /// Materialize `source` as a local JPEG under `dest_dir`.
    ///
    /// `tag` keeps files from concurrent renders apart. A failed photo
    /// download falls back to a grey placeholder labelled with its keyword.
    pub async fn download(&self, source: &ImageSource, dest_dir: &Path, tag: &str) -> Option<PathBuf> {
        match source {
            ImageSource::Placeholder { keyword, color, .. } => {
                let dest = dest_dir.join(format!("placeholder_{tag}_{}.jpg", source.id()));
                synthesize_logged(*color, keyword, &dest).await
            }
            ImageSource::Remote { id, url, keyword } => {
                let dest = dest_dir.join(format!("image_{tag}_{id}.jpg"));
                match self.download_remote(url, &dest).await {
                    Ok(()) => Some(dest),
                    Err(e) => {
                        error!(image_id = %id, error = %e, "error downloading image");
                        let fallback = dest_dir.join(format!("placeholder_{tag}_{id}.jpg"));
                        synthesize_logged(FALLBACK_COLOR, keyword, &fallback).await
                    }
                }
            }
        }
    }

    async fn download_remote(&self, url: &str, dest: &Path) -> Result<(), ProviderError> {
        let response = self.client.get(url).timeout(DOWNLOAD_TIMEOUT).send().await?;
        let bytes = ensure_success(SERVICE, response).await?.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}

async fn synthesize_logged(color: [u8; 3], keyword: &str, dest: &Path) -> Option<PathBuf> {
    match placeholder::synthesize(color, keyword, dest).await {
        Ok(path) => Some(path),
        Err(e) => {
            error!(path = %dest.display(), error = %e, "error creating placeholder image");
            None
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
