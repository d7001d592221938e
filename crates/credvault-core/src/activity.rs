//! Per-user activity log.
//!
//! Entries are stored under `users/{id}/activity/{timestamp}-{uuid}` where
//! the timestamp is fixed-width RFC 3339 with nanoseconds, so ascending key
//! order is chronological and "newest first" is a reversed scan.
//!
//! An optional [`ActivitySink`] receives a copy of every entry. The store is
//! the record of truth; a sink failure is logged and otherwise ignored.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use credvault_storage::StorageBackend;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::error::{SinkError, StoreError};
use crate::models::{ActivityAction, ActivityEntry};

/// Where a request came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// The IP for use in descriptions, `"unknown"` when absent.
    #[must_use]
    pub fn ip_or_unknown(&self) -> &str {
        self.ip.as_deref().unwrap_or("unknown")
    }
}

/// A secondary destination for activity entries.
#[async_trait::async_trait]
pub trait ActivitySink: Send + Sync {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error if the entry could not be written.
    async fn write(&self, entry: &ActivityEntry) -> Result<(), SinkError>;
}

/// Appends entries as JSON lines to a file.
pub struct FileActivitySink {
    path: PathBuf,
    file: Mutex<Option<tokio::fs::File>>,
}

impl FileActivitySink {
    /// The file is opened for append on first write.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: Mutex::new(None),
        }
    }

    fn failure(&self, reason: String) -> SinkError {
        SinkError::Failure {
            name: self.name().to_owned(),
            reason,
        }
    }
}

#[async_trait::async_trait]
impl ActivitySink for FileActivitySink {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "file"
    }

    async fn write(&self, entry: &ActivityEntry) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(entry).map_err(|e| SinkError::Serialization {
            reason: e.to_string(),
        })?;
        line.push(b'\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            let opened = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await
                .map_err(|e| self.failure(format!("cannot open '{}': {e}", self.path.display())))?;
            *guard = Some(opened);
        }
        let Some(file) = guard.as_mut() else {
            return Err(self.failure("file handle missing after open".to_owned()));
        };

        file.write_all(&line)
            .await
            .map_err(|e| self.failure(format!("write failed: {e}")))?;
        file.flush()
            .await
            .map_err(|e| self.failure(format!("flush failed: {e}")))
    }
}

impl std::fmt::Debug for FileActivitySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileActivitySink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Records and reads user activity.
pub struct ActivityLog {
    storage: Arc<dyn StorageBackend>,
    sink: Option<Arc<dyn ActivitySink>>,
}

impl ActivityLog {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            sink: None,
        }
    }

    /// Mirror every entry into `sink` as well.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Append an entry for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the entry cannot be stored. Sink failures
    /// are not errors.
    pub async fn log(
        &self,
        user_id: Uuid,
        action: ActivityAction,
        description: impl Into<String>,
        client: &ClientInfo,
    ) -> Result<ActivityEntry, StoreError> {
        let entry = ActivityEntry {
            id: Uuid::new_v4(),
            user_id,
            action,
            description: description.into(),
            ip_address: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            timestamp: Utc::now(),
        };

        let key = format!(
            "{}{}-{}",
            prefix(user_id),
            entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.9fZ"),
            entry.id
        );
        let bytes = serde_json::to_vec(&entry).map_err(|e| StoreError::Serialization {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.storage.put(&key, &bytes).await?;

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.write(&entry).await {
                warn!(sink = sink.name(), error = %e, "activity sink failed");
            }
        }

        Ok(entry)
    }

    /// Up to `limit` entries for `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if storage fails or an entry cannot be decoded.
    pub async fn recent(&self, user_id: Uuid, limit: usize) -> Result<Vec<ActivityEntry>, StoreError> {
        let entries = self.storage.scan(&prefix(user_id)).await?;
        entries
            .into_iter()
            .rev()
            .take(limit)
            .map(|(key, value)| {
                serde_json::from_slice(&value).map_err(|e| StoreError::Serialization {
                    key,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLog")
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .finish_non_exhaustive()
    }
}

fn prefix(user_id: Uuid) -> String {
    format!("users/{user_id}/activity/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use credvault_storage::MemoryBackend;

    use super::*;

    fn client() -> ClientInfo {
        ClientInfo {
            ip: Some("203.0.113.7".to_owned()),
            user_agent: Some("test-agent".to_owned()),
        }
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let log = ActivityLog::new(Arc::new(MemoryBackend::new()));
        let user = Uuid::new_v4();
        for i in 0..5 {
            log.log(user, ActivityAction::ViewNote, format!("Viewed note: n{i}"), &client())
                .await
                .unwrap();
        }

        let recent = log.recent(user, 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].description, "Viewed note: n4");
        assert_eq!(recent[2].description, "Viewed note: n2");
        assert_eq!(recent[0].ip_address.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn users_see_only_their_own_activity() {
        let log = ActivityLog::new(Arc::new(MemoryBackend::new()));
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        log.log(alice, ActivityAction::Login, "User logged in from x", &client())
            .await
            .unwrap();

        assert!(log.recent(bob, 10).await.unwrap().is_empty());
        assert_eq!(log.recent(alice, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_sink_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let log = ActivityLog::new(Arc::new(MemoryBackend::new()))
            .with_sink(Arc::new(FileActivitySink::new(&path)));
        let user = Uuid::new_v4();

        log.log(user, ActivityAction::Login, "first", &ClientInfo::default())
            .await
            .unwrap();
        log.log(user, ActivityAction::Logout, "second", &ClientInfo::default())
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: ActivityEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.action, ActivityAction::Login);
    }

    #[tokio::test]
    async fn broken_sink_does_not_fail_logging() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for append.
        let log = ActivityLog::new(Arc::new(MemoryBackend::new()))
            .with_sink(Arc::new(FileActivitySink::new(dir.path())));
        let user = Uuid::new_v4();

        log.log(user, ActivityAction::ExportData, "Exported user data", &client())
            .await
            .unwrap();
        assert_eq!(log.recent(user, 10).await.unwrap().len(), 1);
    }
}
