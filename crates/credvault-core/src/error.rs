//! Error types for `credvault-core`.
//!
//! Crypto errors never carry key material or plaintext, only a description
//! of the operation that failed.

use std::collections::BTreeMap;
use std::fmt;

use credvault_storage::StorageError;

/// Errors from field encryption.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// Decryption failed: wrong key, tampered ciphertext, or corrupted tag.
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// The stored token is not in the `v1:<base64url>` format.
    #[error("malformed ciphertext: {reason}")]
    Malformed { reason: String },

    /// HKDF key derivation failed.
    #[error("key derivation failed: {reason}")]
    KeyDerivation { reason: String },

    /// The server secret is empty.
    #[error("server secret must not be empty")]
    EmptySecret,
}

/// Field-level validation errors, keyed by field name.
///
/// Collected in one pass so a client can show every problem at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// An empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// A set holding a single error.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Whether no errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collected errors if any were recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Errors from the record stores (credentials, notes, activity, export).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record does not exist for this user.
    #[error("{kind} not found")]
    NotFound { kind: &'static str },

    /// The input failed validation.
    #[error("invalid input: {0}")]
    Invalid(#[from] FieldErrors),

    /// A field could not be encrypted.
    #[error("store crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A stored record could not be (de)serialized.
    #[error("record serialization failed for '{key}': {reason}")]
    Serialization { key: String, reason: String },

    /// The storage backend failed.
    #[error("store storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from user accounts and sessions.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown username or wrong password. Deliberately the same error.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The username is already registered.
    #[error("username '{username}' is already taken")]
    UsernameTaken { username: String },

    /// Registration input failed validation.
    #[error("invalid registration: {0}")]
    Invalid(#[from] FieldErrors),

    /// The session token is unknown or was revoked.
    #[error("session not found")]
    SessionNotFound,

    /// The session has expired.
    #[error("session expired at {expired_at}")]
    SessionExpired { expired_at: String },

    /// The account referenced by a session no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// The session lifetime does not fit in a timestamp.
    #[error("session lifetime out of range: {ttl_secs}s")]
    TtlOutOfRange { ttl_secs: i64 },

    /// Password hashing failed.
    #[error("password hashing failed: {reason}")]
    Hashing { reason: String },

    /// A stored account or session could not be (de)serialized.
    #[error("auth serialization failed for '{key}': {reason}")]
    Serialization { key: String, reason: String },

    /// The storage backend failed.
    #[error("auth storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors from an activity mirror sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The sink could not accept the entry.
    #[error("activity sink '{name}' failed: {reason}")]
    Failure { name: String, reason: String },

    /// The entry could not be serialized.
    #[error("activity entry serialization failed: {reason}")]
    Serialization { reason: String },
}
