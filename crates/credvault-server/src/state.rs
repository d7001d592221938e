//! Shared application state for the `CredVault` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds the user, session, record and activity
//! stores, all backed by the same storage backend and field cipher.

use std::sync::Arc;

use credvault_core::activity::{ActivityLog, FileActivitySink};
use credvault_core::cipher::FieldCipher;
use credvault_core::error::CryptoError;
use credvault_core::search::SearchService;
use credvault_core::sessions::SessionStore;
use credvault_core::users::UserStore;
use credvault_core::vault::{CredentialStore, NoteStore};
use credvault_storage::StorageBackend;
use tracing::info;

use crate::config::ServerConfig;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    pub users: Arc<UserStore>,
    pub sessions: Arc<SessionStore>,
    pub credentials: Arc<CredentialStore>,
    pub notes: Arc<NoteStore>,
    pub search: SearchService,
    pub activity: Arc<ActivityLog>,
    /// Lifetime of newly opened sessions.
    pub session_ttl: chrono::Duration,
    /// Mark the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl AppState {
    /// Wire every store onto `storage`, deriving the field key from the
    /// configured secret.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] if the field key cannot be derived.
    pub fn new(storage: Arc<dyn StorageBackend>, config: &ServerConfig) -> Result<Self, CryptoError> {
        let cipher = FieldCipher::from_secret(config.secret_key.as_bytes())?;

        let credentials = Arc::new(CredentialStore::new(Arc::clone(&storage), cipher.clone()));
        let notes = Arc::new(NoteStore::new(Arc::clone(&storage), cipher));

        let mut activity = ActivityLog::new(Arc::clone(&storage));
        if let Some(path) = &config.activity_file_path {
            activity = activity.with_sink(Arc::new(FileActivitySink::new(path)));
            info!(path = %path, "activity file sink registered");
        }

        Ok(Self {
            users: Arc::new(UserStore::new(Arc::clone(&storage))),
            sessions: Arc::new(SessionStore::new(storage)),
            search: SearchService::new(Arc::clone(&credentials), Arc::clone(&notes)),
            credentials,
            notes,
            activity: Arc::new(activity),
            session_ttl: config.session_ttl(),
            secure_cookies: config.secure_cookies,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
