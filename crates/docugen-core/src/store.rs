//! Generation record storage.
//!
//! [`GenerationStore`] is the interface handlers and background routines use
//! to read and update records. The default implementation is
//! [`MemoryStore`]; records live only as long as the process.
//!
//! Status changes go through [`GenerationStore::complete`] and
//! [`GenerationStore::fail`], which reject any transition out of a terminal
//! state.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::RwLock;

use chrono::Utc;
use thiserror::Error;

use crate::error::ErrorKind;
use crate::record::{GenerationRecord, GenerationStatus, SocialUploads, VideoFiles};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("generation {0} not found")]
    NotFound(String),

    #[error("generation {id} already exists")]
    Duplicate { id: String },

    #[error("generation {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: GenerationStatus,
        to: GenerationStatus,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

pub trait GenerationStore: Send + Sync + 'static {
    /// Insert a new record at the front of the listing order.
    fn insert(
        &self,
        record: GenerationRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<GenerationRecord>, StoreError>> + Send;

    /// All records, newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<GenerationRecord>, StoreError>> + Send;

    fn set_script(
        &self,
        id: &str,
        script: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn set_audio_file(
        &self,
        id: &str,
        path: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn set_description(
        &self,
        id: &str,
        description: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn set_video_files(
        &self,
        id: &str,
        files: VideoFiles,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merge upload results into the record, replacing entries for the same
    /// platform. Returns the updated record.
    fn merge_social_uploads(
        &self,
        id: &str,
        uploads: SocialUploads,
    ) -> impl Future<Output = Result<GenerationRecord, StoreError>> + Send;

    /// `generating → completed`.
    fn complete(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// `generating → failed`.
    fn fail(
        &self,
        id: &str,
        kind: ErrorKind,
        message: String,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<String, GenerationRecord>,
    /// Ids, newest first.
    order: VecDeque<String>,
}

/// In-process store. The lock is never held across an await point.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_record<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut GenerationRecord) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let record = records
            .by_id
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_owned()))?;
        f(record)
    }

    fn finish(
        &self,
        id: &str,
        to: GenerationStatus,
        f: impl FnOnce(&mut GenerationRecord),
    ) -> Result<(), StoreError> {
        self.with_record(id, |record| {
            if record.status.is_terminal() {
                return Err(StoreError::InvalidTransition {
                    id: id.to_owned(),
                    from: record.status,
                    to,
                });
            }
            record.status = to;
            f(record);
            Ok(())
        })
    }
}

impl GenerationStore for MemoryStore {
    async fn insert(&self, record: GenerationRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        if records.by_id.contains_key(&record.id) {
            return Err(StoreError::Duplicate { id: record.id });
        }
        records.order.push_front(record.id.clone());
        records.by_id.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<GenerationRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.by_id.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<GenerationRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records
            .order
            .iter()
            .filter_map(|id| records.by_id.get(id).cloned())
            .collect())
    }

    async fn set_script(&self, id: &str, script: String) -> Result<(), StoreError> {
        self.with_record(id, |r| {
            r.script = Some(script);
            Ok(())
        })
    }

    async fn set_audio_file(&self, id: &str, path: String) -> Result<(), StoreError> {
        self.with_record(id, |r| {
            r.audio_file = Some(path);
            Ok(())
        })
    }

    async fn set_description(&self, id: &str, description: String) -> Result<(), StoreError> {
        self.with_record(id, |r| {
            r.description = Some(description);
            Ok(())
        })
    }

    async fn set_video_files(&self, id: &str, files: VideoFiles) -> Result<(), StoreError> {
        self.with_record(id, |r| {
            r.video_files = Some(files);
            Ok(())
        })
    }

    async fn merge_social_uploads(
        &self,
        id: &str,
        uploads: SocialUploads,
    ) -> Result<GenerationRecord, StoreError> {
        self.with_record(id, |r| {
            r.social_uploads.get_or_insert_with(SocialUploads::new).extend(uploads);
            Ok(r.clone())
        })
    }

    async fn complete(&self, id: &str) -> Result<(), StoreError> {
        self.finish(id, GenerationStatus::Completed, |r| {
            r.completed_at = Some(Utc::now());
        })
    }

    async fn fail(&self, id: &str, kind: ErrorKind, message: String) -> Result<(), StoreError> {
        self.finish(id, GenerationStatus::Failed, |r| {
            r.failed_at = Some(Utc::now());
            r.error = Some(message);
            r.error_type = Some(kind);
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::social::UploadResult;

    fn record(topic: &str) -> GenerationRecord {
        GenerationRecord::new(topic, "history", vec!["16:9".into()], vec![])
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryStore::new();
        let first = record("first");
        let second = record("second");
        store.insert(first.clone()).await.unwrap();
        store.insert(second.clone()).await.unwrap();

        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = MemoryStore::new();
        let r = record("a");
        store.insert(r.clone()).await.unwrap();
        assert!(matches!(
            store.insert(r).await,
            Err(StoreError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn complete_stamps_completed_at_only() {
        let store = MemoryStore::new();
        let r = record("a");
        store.insert(r.clone()).await.unwrap();
        store.complete(&r.id).await.unwrap();

        let got = store.get(&r.id).await.unwrap().unwrap();
        assert_eq!(got.status, GenerationStatus::Completed);
        assert!(got.completed_at.is_some());
        assert!(got.failed_at.is_none());
        assert!(got.error_type.is_none());
    }

    #[tokio::test]
    async fn terminal_status_never_changes() {
        let store = MemoryStore::new();
        let r = record("a");
        store.insert(r.clone()).await.unwrap();
        store
            .fail(&r.id, ErrorKind::ScriptGeneration, "boom".into())
            .await
            .unwrap();

        let err = store.complete(&r.id).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        let err = store
            .fail(&r.id, ErrorKind::General, "again".into())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        let got = store.get(&r.id).await.unwrap().unwrap();
        assert_eq!(got.status, GenerationStatus::Failed);
        assert_eq!(got.error_type, Some(ErrorKind::ScriptGeneration));
        assert_eq!(got.error.as_deref(), Some("boom"));
        assert!(got.completed_at.is_none());
    }

    #[tokio::test]
    async fn updates_to_unknown_ids_fail() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.set_script("missing", "text".into()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn social_uploads_merge_per_platform() {
        let store = MemoryStore::new();
        let r = record("a");
        store.insert(r.clone()).await.unwrap();

        store
            .merge_social_uploads(
                &r.id,
                SocialUploads::from([
                    ("youtube".to_owned(), UploadResult::error("first try")),
                    ("tiktok".to_owned(), UploadResult::pending("later")),
                ]),
            )
            .await
            .unwrap();
        let updated = store
            .merge_social_uploads(
                &r.id,
                SocialUploads::from([("youtube".to_owned(), UploadResult::pending("retry"))]),
            )
            .await
            .unwrap();

        let uploads = updated.social_uploads.unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads["youtube"].message, "retry");
        assert_eq!(uploads["tiktok"].message, "later");
    }
}
