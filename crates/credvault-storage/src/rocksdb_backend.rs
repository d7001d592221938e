//! `RocksDB` storage backend.
//!
//! `RocksDB` is a synchronous C++ library, so every call is moved onto the
//! Tokio blocking pool. Keys are written as raw UTF-8 bytes; `RocksDB`'s
//! default bytewise comparator gives the ascending order the trait promises.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options};

use crate::{StorageBackend, StorageError};

type Db = DBWithThreadMode<MultiThreaded>;

/// A storage backend backed by `RocksDB`.
///
/// # Examples
///
/// ```no_run
/// # use credvault_storage::RocksDbBackend;
/// let backend = RocksDbBackend::open("/var/lib/credvault/data").unwrap();
/// ```
#[derive(Clone)]
pub struct RocksDbBackend {
    db: Arc<Db>,
    path: PathBuf,
}

impl std::fmt::Debug for RocksDbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RocksDbBackend {
    /// Open (or create) a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if `RocksDB` cannot open the directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = Db::open(&opts, path).map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), "rocksdb opened");

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Filesystem path of this database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Walk every entry under `prefix`, handing `(key, value)` to `visit`.
    fn walk_prefix(
        db: &Db,
        prefix: &str,
        mut visit: impl FnMut(String, &[u8]),
    ) -> Result<(), StorageError> {
        let iter = db.iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (k, v) = item.map_err(|e| StorageError::List {
                prefix: prefix.to_owned(),
                reason: e.to_string(),
            })?;
            let key = String::from_utf8(k.to_vec()).map_err(|e| StorageError::InvalidKey {
                reason: e.to_string(),
            })?;
            if !key.starts_with(prefix) {
                break;
            }
            visit(key, &v);
        }
        Ok(())
    }
}

/// Map a failed `spawn_blocking` join into the operation's error variant.
fn join_failed(e: &tokio::task::JoinError) -> String {
    format!("blocking task failed: {e}")
}

#[async_trait::async_trait]
impl StorageBackend for RocksDbBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let db = Arc::clone(&self.db);
        let key = key.to_owned();
        let key_for_err = key.clone();
        tokio::task::spawn_blocking(move || {
            db.get(key.as_bytes()).map_err(|e| StorageError::Read {
                key,
                reason: e.to_string(),
            })
        })
        .await
        .map_err(|e| StorageError::Read {
            key: key_for_err,
            reason: join_failed(&e),
        })?
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let db = Arc::clone(&self.db);
        let key = key.to_owned();
        let key_for_err = key.clone();
        let value = value.to_vec();
        tokio::task::spawn_blocking(move || {
            db.put(key.as_bytes(), &value)
                .map_err(|e| StorageError::Write {
                    key,
                    reason: e.to_string(),
                })
        })
        .await
        .map_err(|e| StorageError::Write {
            key: key_for_err,
            reason: join_failed(&e),
        })?
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let db = Arc::clone(&self.db);
        let key = key.to_owned();
        let key_for_err = key.clone();
        tokio::task::spawn_blocking(move || {
            db.delete(key.as_bytes()).map_err(|e| StorageError::Delete {
                key,
                reason: e.to_string(),
            })
        })
        .await
        .map_err(|e| StorageError::Delete {
            key: key_for_err,
            reason: join_failed(&e),
        })?
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let db = Arc::clone(&self.db);
        let prefix = prefix.to_owned();
        let prefix_for_err = prefix.clone();
        tokio::task::spawn_blocking(move || {
            let mut keys = Vec::new();
            Self::walk_prefix(&db, &prefix, |k, _| keys.push(k))?;
            Ok(keys)
        })
        .await
        .map_err(|e| StorageError::List {
            prefix: prefix_for_err,
            reason: join_failed(&e),
        })?
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let db = Arc::clone(&self.db);
        let prefix = prefix.to_owned();
        let prefix_for_err = prefix.clone();
        tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            Self::walk_prefix(&db, &prefix, |k, v| entries.push((k, v.to_vec())))?;
            Ok(entries)
        })
        .await
        .map_err(|e| StorageError::List {
            prefix: prefix_for_err,
            reason: join_failed(&e),
        })?
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = RocksDbBackend::open(dir.path()).unwrap();
            backend.put("users/a/account", b"alice").await.unwrap();
        }
        let backend = RocksDbBackend::open(dir.path()).unwrap();
        assert_eq!(
            backend.get("users/a/account").await.unwrap(),
            Some(b"alice".to_vec())
        );
    }

    #[tokio::test]
    async fn scan_stops_at_prefix_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RocksDbBackend::open(dir.path()).unwrap();
        backend.put("users/a/notes/1", b"n1").await.unwrap();
        backend.put("users/a/notes/2", b"n2").await.unwrap();
        backend.put("users/b/notes/1", b"other").await.unwrap();

        let entries = backend.scan("users/a/notes/").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, b"n1".to_vec());

        backend.delete("users/a/notes/1").await.unwrap();
        let keys = backend.list("users/a/notes/").await.unwrap();
        assert_eq!(keys, vec!["users/a/notes/2"]);
    }
}
