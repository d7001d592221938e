//! In-memory storage backend.
//!
//! Data lives in a `BTreeMap` behind a `tokio::sync::RwLock` and is lost when
//! the process exits. Used by every unit test in the workspace and by the
//! server when `CREDVAULT_STORAGE=memory`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{StorageBackend, StorageError};

/// An in-memory storage backend.
///
/// Clones share the same map, so a test can hand one clone to a store and
/// inspect the raw bytes through another.
///
/// # Examples
///
/// ```
/// # use credvault_storage::{MemoryBackend, StorageBackend};
/// # #[tokio::main]
/// # async fn main() {
/// let backend = MemoryBackend::new();
/// backend.put("users/u1/account", b"{}").await.unwrap();
/// assert!(backend.exists("users/u1/account").await.unwrap());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether the backend holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.data
            .write()
            .await
            .insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let data = self.data.read().await;
        Ok(data
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let data = self.data.read().await;
        Ok(data
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.read().await.contains_key(key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("users/nobody/account").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_previous_value() {
        let backend = MemoryBackend::new();
        backend.put("k", b"one").await.unwrap();
        backend.put("k", b"two").await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(backend.len().await, 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.put("k", b"v").await.unwrap();
        backend.delete("k").await.unwrap();
        backend.delete("k").await.unwrap();
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn list_stays_inside_prefix() {
        let backend = MemoryBackend::new();
        backend.put("users/a/notes/1", b"1").await.unwrap();
        backend.put("users/a/credentials/2", b"2").await.unwrap();
        backend.put("users/a/credentials/1", b"3").await.unwrap();
        backend.put("users/ab/credentials/9", b"4").await.unwrap();

        let keys = backend.list("users/a/credentials/").await.unwrap();
        assert_eq!(keys, vec!["users/a/credentials/1", "users/a/credentials/2"]);
    }

    #[tokio::test]
    async fn scan_returns_values_in_key_order() {
        let backend = MemoryBackend::new();
        backend.put("log/0002", b"second").await.unwrap();
        backend.put("log/0001", b"first").await.unwrap();
        backend.put("other/0000", b"x").await.unwrap();

        let entries = backend.scan("log/").await.unwrap();
        assert_eq!(
            entries,
            vec![
                ("log/0001".to_owned(), b"first".to_vec()),
                ("log/0002".to_owned(), b"second".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn clones_share_state() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        backend.put("k", b"v").await.unwrap();
        assert!(other.exists("k").await.unwrap());
    }
}
