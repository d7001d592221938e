//! Field-level encryption for secret record fields.
//!
//! Passwords, secret keys and note bodies are encrypted before a record is
//! serialized to storage, and decrypted only when a detail view is built.
//!
//! # Scheme
//!
//! - Key: `HKDF-SHA256(ikm = server secret, info = "credvault-field-v1")`.
//!   The same server secret always yields the same key, so stored data stays
//!   readable across restarts. Changing the secret makes old fields
//!   unreadable; there is no rotation.
//! - Cipher: AES-256-GCM with a fresh 96-bit nonce from `OsRng` per call.
//! - Token: `v1:` followed by base64url (no padding) of
//!   `nonce (12) || ciphertext || tag (16)`.
//! - Empty plaintext is stored as the empty string and never encrypted.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Shown in place of a field that exists but cannot be decrypted.
pub const DECRYPTION_ERROR_PLACEHOLDER: &str = "[Decryption Error]";

const TOKEN_VERSION: &str = "v1:";
const HKDF_INFO: &[u8] = b"credvault-field-v1";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// A 256-bit field key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct FieldKey([u8; 32]);

/// Encrypts and decrypts individual record fields.
///
/// Cheap to clone; holds only the derived key.
#[derive(Clone)]
pub struct FieldCipher {
    key: FieldKey,
}

impl FieldCipher {
    /// Derive the field key from the server secret.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EmptySecret`] if `secret` is empty, or
    /// [`CryptoError::KeyDerivation`] if HKDF expansion fails.
    pub fn from_secret(secret: &[u8]) -> Result<Self, CryptoError> {
        if secret.is_empty() {
            return Err(CryptoError::EmptySecret);
        }
        let hk = Hkdf::<Sha256>::new(None, secret);
        let mut bytes = [0u8; 32];
        hk.expand(HKDF_INFO, &mut bytes)
            .map_err(|e| CryptoError::KeyDerivation {
                reason: e.to_string(),
            })?;
        Ok(Self {
            key: FieldKey(bytes),
        })
    }

    fn aead(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key.0))
    }

    /// Encrypt a field value. Empty input stays empty.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
    pub fn encrypt_field(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .aead()
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::Encryption {
                reason: e.to_string(),
            })?;

        let mut combined = Vec::with_capacity(NONCE_LEN.saturating_add(ciphertext.len()));
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        Ok(format!("{TOKEN_VERSION}{}", URL_SAFE_NO_PAD.encode(combined)))
    }

    /// Decrypt a token produced by [`encrypt_field`](Self::encrypt_field).
    /// Empty input decrypts to an empty string.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::Malformed`] if the token is not `v1:<base64url>` or is
    ///   too short to hold a nonce and tag.
    /// - [`CryptoError::Decryption`] if authentication fails or the plaintext
    ///   is not UTF-8.
    pub fn decrypt_field(&self, token: &str) -> Result<String, CryptoError> {
        if token.is_empty() {
            return Ok(String::new());
        }

        let encoded = token
            .strip_prefix(TOKEN_VERSION)
            .ok_or_else(|| CryptoError::Malformed {
                reason: "missing version prefix".to_owned(),
            })?;
        let combined = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| CryptoError::Malformed {
                reason: e.to_string(),
            })?;

        let min_len = NONCE_LEN.saturating_add(TAG_LEN);
        if combined.len() < min_len {
            return Err(CryptoError::Malformed {
                reason: format!("expected at least {min_len} bytes, got {}", combined.len()),
            });
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .aead()
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| CryptoError::Decryption {
                reason: e.to_string(),
            })?;

        String::from_utf8(plaintext).map_err(|e| CryptoError::Decryption {
            reason: format!("plaintext is not UTF-8: {e}"),
        })
    }

    /// Decrypt for presentation: failures become
    /// [`DECRYPTION_ERROR_PLACEHOLDER`] and are logged, never propagated.
    #[must_use]
    pub fn reveal(&self, token: &str, field: &'static str) -> String {
        match self.decrypt_field(token) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::warn!(field, error = %e, "field could not be decrypted");
                DECRYPTION_ERROR_PLACEHOLDER.to_owned()
            }
        }
    }
}

impl fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
