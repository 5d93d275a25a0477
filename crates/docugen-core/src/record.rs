//! The generation record – the only entity the service keeps.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::social::UploadResult;

/// Formats produced when a request does not name any.
pub const DEFAULT_ASPECT_RATIOS: [&str; 3] = ["16:9", "9:16", "1:1"];

/// Ratio label → output path, or `None` when that format failed.
pub type VideoFiles = BTreeMap<String, Option<String>>;

/// Platform name → upload outcome.
pub type SocialUploads = BTreeMap<String, UploadResult>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GenerationStatus {
    Generating,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, GenerationStatus::Generating)
    }
}

/// One documentary request, tracked end-to-end.
///
/// Optional fields are filled in as stages succeed and are omitted from the
/// JSON form while unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: String,
    pub topic: String,
    pub niche: String,
    pub status: GenerationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<DateTime<Utc>>,
    pub aspect_ratios: Vec<String>,
    pub social_platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_files: Option<VideoFiles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_uploads: Option<SocialUploads>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
}

impl GenerationRecord {
    /// Create a fresh record in the `generating` state.
    pub fn new(
        topic: impl Into<String>,
        niche: impl Into<String>,
        aspect_ratios: Vec<String>,
        social_platforms: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            niche: niche.into(),
            status: GenerationStatus::Generating,
            created_at: Utc::now(),
            completed_at: None,
            failed_at: None,
            aspect_ratios,
            social_platforms,
            script: None,
            description: None,
            audio_file: None,
            video_files: None,
            social_uploads: None,
            error: None,
            error_type: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == GenerationStatus::Completed
    }

    /// Path of the video rendered for `ratio`, if that format succeeded.
    pub fn video_path(&self, ratio: &str) -> Option<&str> {
        self.video_files
            .as_ref()
            .and_then(|files| files.get(ratio))
            .and_then(|path| path.as_deref())
    }

    /// `true` when at least one format produced a file.
    pub fn has_video_files(&self) -> bool {
        self.video_files
            .as_ref()
            .is_some_and(|files| files.values().any(Option::is_some))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    fn record() -> GenerationRecord {
        GenerationRecord::new("Coral reefs", "nature", vec!["16:9".into()], vec![])
    }

    #[test]
    fn new_record_is_generating() {
        let r = record();
        assert_eq!(r.status, GenerationStatus::Generating);
        assert!(r.completed_at.is_none() && r.failed_at.is_none());
        assert!(Uuid::parse_str(&r.id).is_ok());
    }

    #[test]
    fn unset_fields_are_omitted_from_json() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["status"], "generating");
        assert!(json.get("script").is_none());
        assert!(json.get("video_files").is_none());
        assert!(json.get("error_type").is_none());
    }

    #[test]
    fn video_path_skips_failed_formats() {
        let mut r = record();
        let mut files = VideoFiles::new();
        files.insert("16:9".into(), Some("/tmp/video_1_16x9.mp4".into()));
        files.insert("9:16".into(), None);
        r.video_files = Some(files);

        assert_eq!(r.video_path("16:9"), Some("/tmp/video_1_16x9.mp4"));
        assert_eq!(r.video_path("9:16"), None);
        assert_eq!(r.video_path("1:1"), None);
        assert!(r.has_video_files());
    }

    #[test]
    fn all_failed_formats_mean_no_video_files() {
        let mut r = record();
        r.video_files = Some(VideoFiles::from([("16:9".to_owned(), None)]));
        assert!(!r.has_video_files());
    }
}
