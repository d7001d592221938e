//! Login sessions.
//!
//! A session token is a UUID v4 handed to the client once, at login. Only
//! `SHA-256(token)` is stored, under `sessions/{hash}`, so a storage dump
//! does not yield usable tokens. Each session also carries a CSRF token the
//! browser must echo on unsafe requests; that comparison is constant-time.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use credvault_storage::StorageBackend;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AuthError;

const SESSION_PREFIX: &str = "sessions/";

/// A stored session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Hex SHA-256 of the plaintext token. Also the storage key suffix.
    pub token_hash: String,
    pub user_id: Uuid,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Constant-time check of a client-supplied CSRF token.
    #[must_use]
    pub fn csrf_matches(&self, candidate: &str) -> bool {
        self.csrf_token
            .as_bytes()
            .ct_eq(candidate.as_bytes())
            .into()
    }

    /// First eight hex characters of the token hash, for logs.
    #[must_use]
    pub fn log_id(&self) -> &str {
        self.token_hash.get(..8).unwrap_or(&self.token_hash)
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// What the client receives when a session is opened.
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Plaintext token. Returned once, never stored.
    pub token: String,
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Opens, resolves and closes sessions.
pub struct SessionStore {
    storage: Arc<dyn StorageBackend>,
}

impl SessionStore {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Open a session for `user_id` lasting `ttl`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TtlOutOfRange`] if `ttl` overflows the expiry timestamp.
    /// - [`AuthError::Storage`] if the session cannot be persisted.
    pub async fn create(&self, user_id: Uuid, ttl: Duration) -> Result<NewSession, AuthError> {
        let token = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(AuthError::TtlOutOfRange {
                ttl_secs: ttl.num_seconds(),
            })?;
        let session = Session {
            token_hash: hash_token(&token),
            user_id,
            csrf_token: Uuid::new_v4().simple().to_string(),
            created_at: now,
            expires_at,
        };

        let key = session_key(&session.token_hash);
        let bytes = serde_json::to_vec(&session).map_err(|e| AuthError::Serialization {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.storage.put(&key, &bytes).await?;

        info!(user_id = %user_id, session = session.log_id(), "session opened");

        Ok(NewSession {
            token,
            csrf_token: session.csrf_token,
            expires_at: session.expires_at,
        })
    }

    /// Resolve a plaintext token. An expired session is deleted on sight.
    ///
    /// # Errors
    ///
    /// - [`AuthError::SessionNotFound`] for an unknown or revoked token.
    /// - [`AuthError::SessionExpired`] if the TTL has passed.
    pub async fn lookup(&self, token: &str) -> Result<Session, AuthError> {
        let key = session_key(&hash_token(token));
        let data = self
            .storage
            .get(&key)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        let session: Session =
            serde_json::from_slice(&data).map_err(|e| AuthError::Serialization {
                key: key.clone(),
                reason: e.to_string(),
            })?;

        if session.is_expired(Utc::now()) {
            self.storage.delete(&key).await?;
            return Err(AuthError::SessionExpired {
                expired_at: session.expires_at.to_rfc3339(),
            });
        }

        Ok(session)
    }

    /// Close a session. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the delete fails.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let token_hash = hash_token(token);
        self.storage.delete(&session_key(&token_hash)).await?;
        info!(
            session = token_hash.get(..8).unwrap_or_default(),
            "session revoked"
        );
        Ok(())
    }

    /// Delete every expired session, returning how many were removed.
    /// Entries that fail to decode are removed too.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] if the scan or a delete fails.
    pub async fn sweep_expired(&self) -> Result<usize, AuthError> {
        let now = Utc::now();
        let mut removed = 0usize;
        for (key, value) in self.storage.scan(SESSION_PREFIX).await? {
            let stale = serde_json::from_slice::<Session>(&value)
                .map_or(true, |s| s.is_expired(now));
            if stale {
                self.storage.delete(&key).await?;
                removed = removed.saturating_add(1);
            }
        }
        if removed > 0 {
            debug!(removed, "expired sessions swept");
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

/// Hex SHA-256 of a plaintext token.
#[must_use]
pub fn hash_token(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

fn session_key(token_hash: &str) -> String {
    format!("{SESSION_PREFIX}{token_hash}")
}
