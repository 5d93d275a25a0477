//! Publishing finished videos to social platforms.
//!
//! Only YouTube performs a real upload; the other platforms report a pending
//! status once their credential is present.

use std::io::SeekFrom;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_RANGE, LOCATION, RANGE};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{error, info, warn};

use crate::error::ProviderError;
use crate::record::{SocialUploads, VideoFiles};

pub const YOUTUBE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";
const YOUTUBE_WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const YOUTUBE_CATEGORY: &str = "22";
const CHUNK_SIZE: usize = 8 * 1024 * 1024;
/// Consecutive `308` replies without new bytes before the upload is abandoned.
const MAX_STALLED_CHUNKS: u32 = 3;
const SERVICE: &str = "YouTube";

/// A supported upload target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    YouTube,
    TikTok,
    Facebook,
    Instagram,
}

impl Platform {
    /// Aspect ratio of the video each platform receives.
    pub fn required_ratio(self) -> &'static str {
        match self {
            Platform::YouTube | Platform::Facebook => "16:9",
            Platform::TikTok => "9:16",
            Platform::Instagram => "1:1",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::TikTok => "TikTok",
            Platform::Facebook => "Facebook",
            Platform::Instagram => "Instagram",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UploadStatus {
    Success,
    Pending,
    Error,
}

/// Outcome of publishing to one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub status: UploadStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

impl UploadResult {
    pub fn success(message: impl Into<String>, url: String, video_id: String) -> Self {
        Self {
            status: UploadStatus::Success,
            message: message.into(),
            url: Some(url),
            video_id: Some(video_id),
        }
    }

    pub fn pending(message: impl Into<String>) -> Self {
        Self {
            status: UploadStatus::Pending,
            message: message.into(),
            url: None,
            video_id: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: UploadStatus::Error,
            message: message.into(),
            url: None,
            video_id: None,
        }
    }
}

/// Publishes the videos of one generation.
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    /// One result per requested platform name, unknown names included.
    async fn publish(
        &self,
        video_files: &VideoFiles,
        title: &str,
        description: &str,
        platforms: &[String],
    ) -> SocialUploads;
}

/// Upload credentials, each optional.
#[derive(Debug, Clone, Default)]
pub struct SocialCredentials {
    pub youtube_api_key: Option<String>,
    pub tiktok_access_token: Option<String>,
    pub facebook_access_token: Option<String>,
    pub instagram_access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct VideoMetadata<'a> {
    snippet: Snippet<'a>,
    status: PrivacyStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Snippet<'a> {
    title: &'a str,
    description: &'a str,
    tags: Vec<String>,
    category_id: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrivacyStatus {
    privacy_status: &'static str,
}

#[derive(Debug, Deserialize)]
struct UploadedVideo {
    id: String,
}

pub struct SocialUploader {
    client: reqwest::Client,
    credentials: SocialCredentials,
    youtube_url: String,
}

impl SocialUploader {
    pub fn new(credentials: SocialCredentials) -> Self {
        Self::with_youtube_url(credentials, YOUTUBE_UPLOAD_URL)
    }

    pub fn with_youtube_url(credentials: SocialCredentials, youtube_url: impl Into<String>) -> Self {
        // 308 is "resume incomplete" during resumable uploads, not a redirect.
        let client = reqwest::Client::builder()
            .user_agent(concat!("docugen/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_default();
        Self {
            client,
            credentials,
            youtube_url: youtube_url.into(),
        }
    }

    async fn upload(&self, platform: Platform, video: &Path, title: &str, description: &str) -> UploadResult {
        match platform {
            Platform::YouTube => self.upload_youtube(video, title, description).await,
            Platform::TikTok => stub(
                platform,
                self.credentials.tiktok_access_token.as_deref(),
                "TikTok upload requires OAuth flow - feature coming soon",
            ),
            Platform::Facebook => stub(
                platform,
                self.credentials.facebook_access_token.as_deref(),
                "Facebook upload requires page access - feature coming soon",
            ),
            Platform::Instagram => stub(
                platform,
                self.credentials.instagram_access_token.as_deref(),
                "Instagram upload requires business account - feature coming soon",
            ),
        }
    }

    async fn upload_youtube(&self, video: &Path, title: &str, description: &str) -> UploadResult {
        let Some(api_key) = self.credentials.youtube_api_key.as_deref() else {
            return UploadResult::error("YouTube API key not configured");
        };

        match self.resumable_upload(api_key, video, title, description).await {
            Ok(video_id) => UploadResult::success(
                "Successfully uploaded to YouTube",
                format!("{YOUTUBE_WATCH_URL}{video_id}"),
                video_id,
            ),
            Err(e) => {
                error!(error = %e, "YouTube upload error");
                UploadResult::error(format!("YouTube upload failed: {e}"))
            }
        }
    }

    /// Open an upload session, then send the file in fixed-size chunks.
    async fn resumable_upload(
        &self,
        api_key: &str,
        video: &Path,
        title: &str,
        description: &str,
    ) -> Result<String, ProviderError> {
        let total = tokio::fs::metadata(video).await?.len();
        if total == 0 {
            return Err(ProviderError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "video file is empty",
            )));
        }

        let url = reqwest::Url::parse_with_params(
            &self.youtube_url,
            [
                ("uploadType", "resumable"),
                ("part", "snippet,status"),
                ("key", api_key),
            ],
        )
        .map_err(|e| ProviderError::InvalidResponse {
            service: SERVICE,
            message: format!("invalid upload url: {e}"),
        })?;

        let metadata = VideoMetadata {
            snippet: Snippet {
                title,
                description,
                tags: Vec::new(),
                category_id: YOUTUBE_CATEGORY,
            },
            status: PrivacyStatus {
                privacy_status: "public",
            },
        };

        let response = self
            .client
            .post(url)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", total)
            .json(&metadata)
            .send()
            .await?;
        let response = crate::providers::ensure_success(SERVICE, response).await?;
        let session = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ProviderError::InvalidResponse {
                service: SERVICE,
                message: "upload session location missing".into(),
            })?
            .to_owned();

        let mut file = tokio::fs::File::open(video).await?;
        let mut offset = 0u64;
        let mut stalled = 0;
        loop {
            let len = CHUNK_SIZE.min((total - offset) as usize);
            let mut chunk = vec![0u8; len];
            file.seek(SeekFrom::Start(offset)).await?;
            file.read_exact(&mut chunk).await?;
            let last = offset + len as u64 - 1;

            let response = self
                .client
                .put(&session)
                .header(CONTENT_RANGE, format!("bytes {offset}-{last}/{total}"))
                .body(chunk)
                .send()
                .await?;

            let status = response.status();
            if status.as_u16() == 308 {
                // The server reports what it has persisted; resume right after it.
                let next = committed_bytes(response.headers());
                if next >= total {
                    return Err(ProviderError::InvalidResponse {
                        service: SERVICE,
                        message: "upload not finalized after all bytes were sent".into(),
                    });
                }
                stalled = if next > offset { 0 } else { stalled + 1 };
                if stalled >= MAX_STALLED_CHUNKS {
                    return Err(ProviderError::InvalidResponse {
                        service: SERVICE,
                        message: format!("upload stalled at byte {next} of {total}"),
                    });
                }
                offset = next;
                continue;
            }
            if status.is_success() {
                let uploaded: UploadedVideo = response.json().await?;
                return Ok(uploaded.id);
            }
            return Err(ProviderError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
    }
}

/// Bytes persisted according to a `308` reply's `Range: bytes=0-N` header.
/// No header means nothing was kept.
fn committed_bytes(headers: &HeaderMap) -> u64 {
    headers
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().strip_prefix("bytes=0-"))
        .and_then(|last| last.parse::<u64>().ok())
        .map_or(0, |last| last + 1)
}

fn stub(platform: Platform, token: Option<&str>, pending: &str) -> UploadResult {
    if token.is_none() {
        return UploadResult::error(format!("{} access token not configured", platform.display_name()));
    }
    UploadResult::pending(pending)
}

#[async_trait]
impl SocialPublisher for SocialUploader {
    async fn publish(
        &self,
        video_files: &VideoFiles,
        title: &str,
        description: &str,
        platforms: &[String],
    ) -> SocialUploads {
        let mut results = SocialUploads::new();
        for name in platforms {
            let result = match Platform::from_str(name) {
                Err(_) => UploadResult::error(format!("Unsupported platform: {name}")),
                Ok(platform) => {
                    let ratio = platform.required_ratio();
                    match existing_video(video_files, ratio).await {
                        Some(video) => self.upload(platform, Path::new(video), title, description).await,
                        None => UploadResult::error(format!("Video file not found for format {ratio}")),
                    }
                }
            };

            match result.status {
                UploadStatus::Error => warn!(platform = %name, message = %result.message, "social upload failed"),
                _ => info!(platform = %name, status = %result.status, "social upload processed"),
            }
            results.insert(name.clone(), result);
        }
        results
    }
}

async fn existing_video<'a>(video_files: &'a VideoFiles, ratio: &str) -> Option<&'a str> {
    let path = video_files.get(ratio)?.as_deref()?;
    tokio::fs::try_exists(path).await.unwrap_or(false).then_some(path)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    fn uploader(credentials: SocialCredentials) -> SocialUploader {
        SocialUploader::with_youtube_url(credentials, "http://127.0.0.1:9/upload/youtube/v3/videos")
    }

    fn scratch_video() -> String {
        let path = std::env::temp_dir().join(format!("video_{}_16x9.mp4", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"not really an mp4").unwrap();
        path.to_string_lossy().into_owned()
    }

    fn all_formats(path: &str) -> VideoFiles {
        VideoFiles::from([
            ("16:9".to_owned(), Some(path.to_owned())),
            ("9:16".to_owned(), Some(path.to_owned())),
            ("1:1".to_owned(), Some(path.to_owned())),
        ])
    }

    #[test]
    fn platform_ratio_table_is_fixed() {
        assert_eq!(Platform::from_str("youtube").unwrap().required_ratio(), "16:9");
        assert_eq!(Platform::from_str("tiktok").unwrap().required_ratio(), "9:16");
        assert_eq!(Platform::from_str("facebook").unwrap().required_ratio(), "16:9");
        assert_eq!(Platform::from_str("instagram").unwrap().required_ratio(), "1:1");
        assert!(Platform::from_str("YouTube").is_err());
        assert_eq!(Platform::TikTok.to_string(), "tiktok");
    }

    #[test]
    fn results_omit_unset_fields() {
        let json = serde_json::to_value(UploadResult::pending("later")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "pending", "message": "later"}));

        let json = serde_json::to_value(UploadResult::success(
            "ok",
            "https://www.youtube.com/watch?v=abc".into(),
            "abc".into(),
        ))
        .unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["video_id"], "abc");
    }

    #[tokio::test]
    async fn unknown_platform_is_reported_not_skipped() {
        let results = uploader(SocialCredentials::default())
            .publish(&VideoFiles::new(), "t", "d", &["myspace".to_owned()])
            .await;
        assert_eq!(results["myspace"], UploadResult::error("Unsupported platform: myspace"));
    }

    #[tokio::test]
    async fn missing_or_failed_format_is_an_error() {
        let files = VideoFiles::from([
            ("16:9".to_owned(), None),
            ("1:1".to_owned(), Some("/nonexistent/video_x_1x1.mp4".to_owned())),
        ]);
        let platforms = ["youtube".to_owned(), "instagram".to_owned(), "tiktok".to_owned()];
        let results = uploader(SocialCredentials::default())
            .publish(&files, "t", "d", &platforms)
            .await;

        assert_eq!(results["youtube"].message, "Video file not found for format 16:9");
        assert_eq!(results["instagram"].message, "Video file not found for format 1:1");
        assert_eq!(results["tiktok"].message, "Video file not found for format 9:16");
        assert!(results.values().all(|r| r.status == UploadStatus::Error));
    }

    #[tokio::test]
    async fn missing_format_fails_only_its_platform() {
        let video = scratch_video();
        let files = VideoFiles::from([
            ("16:9".to_owned(), None),
            ("9:16".to_owned(), Some(video.clone())),
        ]);
        let platforms = ["youtube".to_owned(), "tiktok".to_owned()];
        let results = uploader(SocialCredentials {
            tiktok_access_token: Some("t".into()),
            ..Default::default()
        })
        .publish(&files, "t", "d", &platforms)
        .await;

        assert_eq!(results["youtube"], UploadResult::error("Video file not found for format 16:9"));
        assert_eq!(results["tiktok"].status, UploadStatus::Pending);
        std::fs::remove_file(video).ok();
    }

    #[tokio::test]
    async fn stubs_need_tokens_and_report_pending() {
        let video = scratch_video();
        let files = all_formats(&video);
        let platforms = ["tiktok".to_owned(), "facebook".to_owned(), "instagram".to_owned()];

        let without = uploader(SocialCredentials::default())
            .publish(&files, "t", "d", &platforms)
            .await;
        assert_eq!(without["tiktok"].message, "TikTok access token not configured");
        assert_eq!(without["facebook"].message, "Facebook access token not configured");
        assert_eq!(without["instagram"].message, "Instagram access token not configured");

        let with = uploader(SocialCredentials {
            tiktok_access_token: Some("t".into()),
            facebook_access_token: Some("f".into()),
            instagram_access_token: Some("i".into()),
            ..Default::default()
        })
        .publish(&files, "t", "d", &platforms)
        .await;
        assert_eq!(
            with["tiktok"],
            UploadResult::pending("TikTok upload requires OAuth flow - feature coming soon")
        );
        assert_eq!(with["facebook"].status, UploadStatus::Pending);
        assert_eq!(
            with["instagram"].message,
            "Instagram upload requires business account - feature coming soon"
        );

        std::fs::remove_file(video).ok();
    }

    #[tokio::test]
    async fn youtube_requires_key_and_wraps_failures() {
        let video = scratch_video();
        let files = all_formats(&video);
        let platforms = ["youtube".to_owned()];

        let results = uploader(SocialCredentials::default())
            .publish(&files, "t", "d", &platforms)
            .await;
        assert_eq!(results["youtube"].message, "YouTube API key not configured");

        let results = uploader(SocialCredentials {
            youtube_api_key: Some("key".into()),
            ..Default::default()
        })
        .publish(&files, "t", "d", &platforms)
        .await;
        assert_eq!(results["youtube"].status, UploadStatus::Error);
        assert!(results["youtube"].message.starts_with("YouTube upload failed: "));

        std::fs::remove_file(video).ok();
    }

    /// A local stand-in for the YouTube resumable endpoint that persists at
    /// most `keep` bytes per PUT.
    struct FakeYouTube {
        session_url: String,
        keep: Option<usize>,
        received: std::sync::Mutex<usize>,
        content_ranges: std::sync::Mutex<Vec<String>>,
    }

    async fn fake_youtube(keep: Option<usize>) -> (String, std::sync::Arc<FakeYouTube>) {
        use axum::extract::State;
        use axum::http::{header, HeaderMap, StatusCode};
        use axum::response::IntoResponse;
        use axum::routing::{post, put};
        use std::sync::Arc;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let fake = Arc::new(FakeYouTube {
            session_url: format!("http://{addr}/session"),
            keep,
            received: Default::default(),
            content_ranges: Default::default(),
        });

        async fn open(State(fake): State<Arc<FakeYouTube>>) -> impl IntoResponse {
            (StatusCode::OK, [(header::LOCATION, fake.session_url.clone())])
        }

        async fn chunk(
            State(fake): State<Arc<FakeYouTube>>,
            headers: HeaderMap,
            body: axum::body::Bytes,
        ) -> axum::response::Response {
            let range = headers[header::CONTENT_RANGE].to_str().unwrap().to_owned();
            fake.content_ranges.lock().unwrap().push(range.clone());
            let (span, total) = range.strip_prefix("bytes ").unwrap().split_once('/').unwrap();
            let start: usize = span.split_once('-').unwrap().0.parse().unwrap();
            let total: usize = total.parse().unwrap();

            let mut received = fake.received.lock().unwrap();
            if start != *received {
                return StatusCode::BAD_REQUEST.into_response();
            }
            let Some(keep) = fake.keep else {
                return StatusCode::PERMANENT_REDIRECT.into_response();
            };
            *received += keep.min(body.len());
            if *received < total {
                let kept = format!("bytes=0-{}", *received - 1);
                return (StatusCode::PERMANENT_REDIRECT, [(header::RANGE, kept)]).into_response();
            }
            axum::Json(serde_json::json!({"id": "abc123"})).into_response()
        }

        let app = axum::Router::new()
            .route("/upload", post(open))
            .route("/session", put(chunk))
            .with_state(Arc::clone(&fake));
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/upload"), fake)
    }

    fn youtube_uploader(url: &str) -> SocialUploader {
        SocialUploader::with_youtube_url(
            SocialCredentials {
                youtube_api_key: Some("key".into()),
                ..Default::default()
            },
            url,
        )
    }

    fn sized_video(len: usize) -> String {
        let path = std::env::temp_dir().join(format!("video_{}_16x9.mp4", uuid::Uuid::new_v4()));
        std::fs::write(&path, vec![7u8; len]).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn resumable_upload_resends_what_the_server_did_not_keep() {
        let (url, fake) = fake_youtube(Some(100)).await;
        let video = sized_video(300);

        let results = youtube_uploader(&url)
            .publish(&all_formats(&video), "t", "d", &["youtube".to_owned()])
            .await;

        assert_eq!(
            results["youtube"],
            UploadResult::success(
                "Successfully uploaded to YouTube",
                "https://www.youtube.com/watch?v=abc123".into(),
                "abc123".into(),
            )
        );
        assert_eq!(
            *fake.content_ranges.lock().unwrap(),
            ["bytes 0-299/300", "bytes 100-299/300", "bytes 200-299/300"]
        );
        std::fs::remove_file(video).ok();
    }

    #[tokio::test]
    async fn resumable_upload_gives_up_when_nothing_is_kept() {
        let (url, fake) = fake_youtube(None).await;
        let video = sized_video(300);

        let results = youtube_uploader(&url)
            .publish(&all_formats(&video), "t", "d", &["youtube".to_owned()])
            .await;

        assert_eq!(results["youtube"].status, UploadStatus::Error);
        assert!(results["youtube"].message.contains("upload stalled at byte 0 of 300"));
        assert_eq!(fake.content_ranges.lock().unwrap().len(), MAX_STALLED_CHUNKS as usize);
        std::fs::remove_file(video).ok();
    }

    #[test]
    fn committed_bytes_reads_the_range_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(committed_bytes(&headers), 0);
        headers.insert(RANGE, "bytes=0-99".parse().unwrap());
        assert_eq!(committed_bytes(&headers), 100);
        headers.insert(RANGE, "bytes=5-9".parse().unwrap());
        assert_eq!(committed_bytes(&headers), 0);
    }
}
