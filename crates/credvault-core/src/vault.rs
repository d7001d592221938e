//! User-scoped credential and note stores.
//!
//! Every method takes the acting user's id and only ever addresses keys
//! under `users/{user_id}/`. A record belonging to someone else cannot be
//! reached, and is reported exactly like a missing one. Decoded records are
//! also checked against their stored `owner_id`.
//!
//! Secret fields are encrypted with the [`FieldCipher`] before a record is
//! written and only decrypted by `reveal`.

use std::sync::Arc;

use chrono::Utc;
use credvault_storage::StorageBackend;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cipher::FieldCipher;
use crate::error::StoreError;
use crate::models::{
    Credential, CredentialDetail, CredentialSummary, NoteDetail, NoteSummary, SecureNote,
};
use crate::search::SearchParams;
use crate::validate::{CredentialInput, NoteInput};

/// A record that knows its owner.
trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for Credential {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for SecureNote {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// One collection (`credentials` or `notes`) under each user's prefix.
struct Collection {
    storage: Arc<dyn StorageBackend>,
    name: &'static str,
    kind: &'static str,
    /// Serialises read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl Collection {
    fn new(storage: Arc<dyn StorageBackend>, name: &'static str, kind: &'static str) -> Self {
        Self {
            storage,
            name,
            kind,
            write_lock: Mutex::new(()),
        }
    }

    fn prefix(&self, user: Uuid) -> String {
        format!("users/{user}/{}/", self.name)
    }

    fn key(&self, user: Uuid, id: Uuid) -> String {
        format!("users/{user}/{}/{id}", self.name)
    }

    fn not_found(&self) -> StoreError {
        StoreError::NotFound { kind: self.kind }
    }

    fn decode<T: DeserializeOwned + Owned>(
        &self,
        user: Uuid,
        key: String,
        bytes: &[u8],
    ) -> Result<Option<T>, StoreError> {
        let record: T = serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        if record.owner_id() == user {
            Ok(Some(record))
        } else {
            warn!(%key, "record owner does not match its key prefix");
            Ok(None)
        }
    }

    async fn get<T: DeserializeOwned + Owned>(&self, user: Uuid, id: Uuid) -> Result<T, StoreError> {
        let key = self.key(user, id);
        let Some(bytes) = self.storage.get(&key).await? else {
            return Err(self.not_found());
        };
        self.decode(user, key, &bytes)?.ok_or_else(|| self.not_found())
    }

    async fn all<T: DeserializeOwned + Owned>(&self, user: Uuid) -> Result<Vec<T>, StoreError> {
        let mut records = Vec::new();
        for (key, bytes) in self.storage.scan(&self.prefix(user)).await? {
            if let Some(record) = self.decode(user, key, &bytes)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn put<T: Serialize>(&self, user: Uuid, id: Uuid, record: &T) -> Result<(), StoreError> {
        let key = self.key(user, id);
        let bytes = serde_json::to_vec(record).map_err(|e| StoreError::Serialization {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.storage.put(&key, &bytes).await?;
        Ok(())
    }

    async fn remove(&self, user: Uuid, id: Uuid) -> Result<(), StoreError> {
        self.storage.delete(&self.key(user, id)).await?;
        Ok(())
    }
}

// ── Credentials ──────────────────────────────────────────────────────

/// Encrypted credentials, per user.
pub struct CredentialStore {
    records: Collection,
    cipher: FieldCipher,
}

impl CredentialStore {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, cipher: FieldCipher) -> Self {
        Self {
            records: Collection::new(storage, "credentials", "credential"),
            cipher,
        }
    }

    /// Credentials matching `params`, most recently updated first.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Invalid`] for an unknown type filter.
    /// - [`StoreError::Storage`] or [`StoreError::Serialization`] on read failure.
    pub async fn list(&self, user: Uuid, params: &SearchParams) -> Result<Vec<Credential>, StoreError> {
        let kind = params.kind_filter()?;
        let needle = params.needle();
        let mut matched: Vec<Credential> = self
            .records
            .all::<Credential>(user)
            .await?
            .into_iter()
            .filter(|c| !params.favorites_only || c.is_favorite)
            .filter(|c| kind.is_none_or(|k| c.kind == k))
            .filter(|c| needle.as_deref().is_none_or(|n| c.matches(n)))
            .collect();
        matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(matched)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `user` has no credential `id`.
    pub async fn get(&self, user: Uuid, id: Uuid) -> Result<Credential, StoreError> {
        self.records.get(user, id).await
    }

    /// Validate, encrypt and store a new credential.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] with every failing field, or a crypto
    /// or storage error.
    pub async fn create(&self, user: Uuid, input: CredentialInput) -> Result<Credential, StoreError> {
        let valid = input.validate()?;
        let now = Utc::now();
        let secret_key = self.cipher.encrypt_field(&valid.secret_key)?;
        let credential = Credential {
            id: Uuid::new_v4(),
            owner_id: user,
            label: valid.label,
            kind: valid.kind,
            website_url: valid.website_url,
            username: valid.username,
            email: valid.email,
            password_encrypted: self.cipher.encrypt_field(&valid.password)?,
            secret_key_encrypted: (!secret_key.is_empty()).then_some(secret_key),
            note: valid.note,
            is_favorite: valid.is_favorite.unwrap_or(false),
            tags: valid.tags,
            created_at: now,
            updated_at: now,
            last_accessed: None,
        };
        self.records.put(user, credential.id, &credential).await?;
        debug!(user_id = %user, credential_id = %credential.id, "credential created");
        Ok(credential)
    }

    /// Replace a credential's fields.
    ///
    /// A blank password or secret key keeps the stored value; anything else
    /// is re-encrypted. An absent `is_favorite` keeps the current flag.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`], [`StoreError::Invalid`], or an internal error.
    pub async fn update(
        &self,
        user: Uuid,
        id: Uuid,
        input: CredentialInput,
    ) -> Result<Credential, StoreError> {
        let valid = input.validate()?;
        let _guard = self.records.write_lock.lock().await;
        let mut credential: Credential = self.records.get(user, id).await?;

        credential.label = valid.label;
        credential.kind = valid.kind;
        credential.website_url = valid.website_url;
        credential.username = valid.username;
        credential.email = valid.email;
        credential.note = valid.note;
        credential.tags = valid.tags;
        if let Some(favorite) = valid.is_favorite {
            credential.is_favorite = favorite;
        }
        if !valid.password.is_empty() {
            credential.password_encrypted = self.cipher.encrypt_field(&valid.password)?;
        }
        if !valid.secret_key.is_empty() {
            credential.secret_key_encrypted = Some(self.cipher.encrypt_field(&valid.secret_key)?);
        }
        credential.updated_at = Utc::now();

        self.records.put(user, id, &credential).await?;
        Ok(credential)
    }

    /// Delete a credential, returning what was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `user` has no credential `id`.
    pub async fn delete(&self, user: Uuid, id: Uuid) -> Result<Credential, StoreError> {
        let _guard = self.records.write_lock.lock().await;
        let credential: Credential = self.records.get(user, id).await?;
        self.records.remove(user, id).await?;
        Ok(credential)
    }

    /// Flip the favorite flag and return the new value. `updated_at` is
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `user` has no credential `id`.
    pub async fn toggle_favorite(&self, user: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let _guard = self.records.write_lock.lock().await;
        let mut credential: Credential = self.records.get(user, id).await?;
        credential.is_favorite = !credential.is_favorite;
        self.records.put(user, id, &credential).await?;
        Ok(credential.is_favorite)
    }

    /// Record an access. `updated_at` is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `user` has no credential `id`.
    pub async fn touch(&self, user: Uuid, id: Uuid) -> Result<Credential, StoreError> {
        let _guard = self.records.write_lock.lock().await;
        let mut credential: Credential = self.records.get(user, id).await?;
        credential.last_accessed = Some(Utc::now());
        self.records.put(user, id, &credential).await?;
        Ok(credential)
    }

    /// Decrypt a credential for display. Undecryptable fields show
    /// [`DECRYPTION_ERROR_PLACEHOLDER`](crate::cipher::DECRYPTION_ERROR_PLACEHOLDER).
    #[must_use]
    pub fn reveal(&self, credential: &Credential) -> CredentialDetail {
        CredentialDetail {
            summary: CredentialSummary::from(credential),
            password: self.cipher.reveal(&credential.password_encrypted, "password"),
            secret_key: credential
                .secret_key_encrypted
                .as_deref()
                .map(|t| self.cipher.reveal(t, "secret_key"))
                .unwrap_or_default(),
        }
    }

    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub async fn count(&self, user: Uuid) -> Result<usize, StoreError> {
        Ok(self.records.all::<Credential>(user).await?.len())
    }

    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub async fn count_favorites(&self, user: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .records
            .all::<Credential>(user)
            .await?
            .iter()
            .filter(|r| r.is_favorite)
            .count())
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

// ── Notes ────────────────────────────────────────────────────────────

/// Encrypted secure notes, per user.
pub struct NoteStore {
    records: Collection,
    cipher: FieldCipher,
}

impl NoteStore {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, cipher: FieldCipher) -> Self {
        Self {
            records: Collection::new(storage, "notes", "note"),
            cipher,
        }
    }

    /// Notes matching the text query and favorites flag, most recently
    /// updated first. The credential type filter does not apply to notes.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error on read failure.
    pub async fn list(&self, user: Uuid, params: &SearchParams) -> Result<Vec<SecureNote>, StoreError> {
        let needle = params.needle();
        let mut matched: Vec<SecureNote> = self
            .records
            .all::<SecureNote>(user)
            .await?
            .into_iter()
            .filter(|n| !params.favorites_only || n.is_favorite)
            .filter(|n| needle.as_deref().is_none_or(|q| n.matches(q)))
            .collect();
        matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(matched)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `user` has no note `id`.
    pub async fn get(&self, user: Uuid, id: Uuid) -> Result<SecureNote, StoreError> {
        self.records.get(user, id).await
    }

    /// Validate, encrypt and store a new note.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] with every failing field, or a crypto
    /// or storage error.
    pub async fn create(&self, user: Uuid, input: NoteInput) -> Result<SecureNote, StoreError> {
        let valid = input.validate()?;
        let now = Utc::now();
        let note = SecureNote {
            id: Uuid::new_v4(),
            owner_id: user,
            title: valid.title,
            kind: valid.kind,
            content_encrypted: self.cipher.encrypt_field(&valid.content)?,
            is_favorite: valid.is_favorite.unwrap_or(false),
            tags: valid.tags,
            created_at: now,
            updated_at: now,
            last_accessed: None,
        };
        self.records.put(user, note.id, &note).await?;
        debug!(user_id = %user, note_id = %note.id, "note created");
        Ok(note)
    }

    /// Replace a note's fields, re-encrypting the content.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`], [`StoreError::Invalid`], or an internal error.
    pub async fn update(&self, user: Uuid, id: Uuid, input: NoteInput) -> Result<SecureNote, StoreError> {
        let valid = input.validate()?;
        let _guard = self.records.write_lock.lock().await;
        let mut note: SecureNote = self.records.get(user, id).await?;

        note.title = valid.title;
        note.kind = valid.kind;
        note.content_encrypted = self.cipher.encrypt_field(&valid.content)?;
        note.tags = valid.tags;
        if let Some(favorite) = valid.is_favorite {
            note.is_favorite = favorite;
        }
        note.updated_at = Utc::now();

        self.records.put(user, id, &note).await?;
        Ok(note)
    }

    /// Delete a note, returning what was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `user` has no note `id`.
    pub async fn delete(&self, user: Uuid, id: Uuid) -> Result<SecureNote, StoreError> {
        let _guard = self.records.write_lock.lock().await;
        let note: SecureNote = self.records.get(user, id).await?;
        self.records.remove(user, id).await?;
        Ok(note)
    }

    /// Flip the favorite flag and return the new value. `updated_at` is
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `user` has no note `id`.
    pub async fn toggle_favorite(&self, user: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let _guard = self.records.write_lock.lock().await;
        let mut note: SecureNote = self.records.get(user, id).await?;
        note.is_favorite = !note.is_favorite;
        self.records.put(user, id, &note).await?;
        Ok(note.is_favorite)
    }

    /// Record an access. `updated_at` is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `user` has no note `id`.
    pub async fn touch(&self, user: Uuid, id: Uuid) -> Result<SecureNote, StoreError> {
        let _guard = self.records.write_lock.lock().await;
        let mut note: SecureNote = self.records.get(user, id).await?;
        note.last_accessed = Some(Utc::now());
        self.records.put(user, id, &note).await?;
        Ok(note)
    }

    /// Decrypt a note for display.
    #[must_use]
    pub fn reveal(&self, note: &SecureNote) -> NoteDetail {
        NoteDetail {
            summary: NoteSummary::from(note),
            content: self.cipher.reveal(&note.content_encrypted, "content"),
        }
    }

    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub async fn count(&self, user: Uuid) -> Result<usize, StoreError> {
        Ok(self.records.all::<SecureNote>(user).await?.len())
    }

    /// # Errors
    ///
    /// Returns a storage error if the scan fails.
    pub async fn count_favorites(&self, user: Uuid) -> Result<usize, StoreError> {
        Ok(self
            .records
            .all::<SecureNote>(user)
            .await?
            .iter()
            .filter(|r| r.is_favorite)
            .count())
    }
}

impl std::fmt::Debug for NoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use credvault_storage::MemoryBackend;

    use super::*;
    use crate::cipher::DECRYPTION_ERROR_PLACEHOLDER;
    use crate::models::CredentialKind;

    fn stores() -> (CredentialStore, NoteStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        let cipher = FieldCipher::from_secret(b"vault-test-secret").unwrap();
        (
            CredentialStore::new(Arc::new(backend.clone()), cipher.clone()),
            NoteStore::new(Arc::new(backend.clone()), cipher),
            backend,
        )
    }

    fn github() -> CredentialInput {
        CredentialInput {
            label: "GitHub".to_owned(),
            kind: Some("website".to_owned()),
            username: Some("octocat".to_owned()),
            password: Some("s3cret-passw0rd".to_owned()),
            secret_key: Some("ghp_token".to_owned()),
            tags: Some("dev, code".to_owned()),
            ..CredentialInput::default()
        }
    }

    fn wifi() -> NoteInput {
        NoteInput {
            title: "Home wifi".to_owned(),
            content: "WPA2 passphrase: correct-horse".to_owned(),
            tags: Some("home".to_owned()),
            ..NoteInput::default()
        }
    }

    #[tokio::test]
    async fn secrets_are_encrypted_at_rest() {
        let (creds, notes, backend) = stores();
        let user = Uuid::new_v4();
        let c = creds.create(user, github()).await.unwrap();
        notes.create(user, wifi()).await.unwrap();

        for (_, bytes) in backend.scan("users/").await.unwrap() {
            let raw = String::from_utf8(bytes).unwrap();
            assert!(!raw.contains("s3cret-passw0rd"));
            assert!(!raw.contains("ghp_token"));
            assert!(!raw.contains("correct-horse"));
        }

        let detail = creds.reveal(&c);
        assert_eq!(detail.password, "s3cret-passw0rd");
        assert_eq!(detail.secret_key, "ghp_token");
    }

    #[tokio::test]
    async fn other_users_records_are_not_found() {
        let (creds, notes, _) = stores();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let c = creds.create(alice, github()).await.unwrap();
        let n = notes.create(alice, wifi()).await.unwrap();

        assert!(matches!(creds.get(bob, c.id).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(creds.update(bob, c.id, github()).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(creds.delete(bob, c.id).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(creds.toggle_favorite(bob, c.id).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(notes.touch(bob, n.id).await, Err(StoreError::NotFound { .. })));
        assert!(creds.list(bob, &SearchParams::default()).await.unwrap().is_empty());

        // Alice's records are untouched.
        assert_eq!(creds.count(alice).await.unwrap(), 1);
        assert!(!creds.get(alice, c.id).await.unwrap().is_favorite);
    }

    #[tokio::test]
    async fn mismatched_owner_is_hidden() {
        let (creds, _, backend) = stores();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let c = creds.create(alice, github()).await.unwrap();

        // Plant Alice's record under Bob's prefix.
        let raw = backend
            .get(&format!("users/{alice}/credentials/{}", c.id))
            .await
            .unwrap()
            .unwrap();
        backend
            .put(&format!("users/{bob}/credentials/{}", c.id), &raw)
            .await
            .unwrap();

        assert!(matches!(creds.get(bob, c.id).await, Err(StoreError::NotFound { .. })));
        assert!(creds.list(bob, &SearchParams::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_password_on_update_keeps_current() {
        let (creds, _, _) = stores();
        let user = Uuid::new_v4();
        let c = creds.create(user, github()).await.unwrap();

        let mut edit = github();
        edit.label = "GitHub (work)".to_owned();
        edit.password = Some(String::new());
        edit.secret_key = None;
        let updated = creds.update(user, c.id, edit).await.unwrap();

        assert_eq!(updated.label, "GitHub (work)");
        assert_eq!(updated.password_encrypted, c.password_encrypted);
        let detail = creds.reveal(&updated);
        assert_eq!(detail.password, "s3cret-passw0rd");
        assert_eq!(detail.secret_key, "ghp_token");
        assert!(updated.updated_at >= c.updated_at);

        let mut edit = github();
        edit.password = Some("brand-new-password".to_owned());
        let updated = creds.update(user, c.id, edit).await.unwrap();
        assert_eq!(creds.reveal(&updated).password, "brand-new-password");
    }

    #[tokio::test]
    async fn list_filters_and_orders() {
        let (creds, _, _) = stores();
        let user = Uuid::new_v4();
        let first = creds.create(user, github()).await.unwrap();
        let mut bank = github();
        bank.label = "Bank".to_owned();
        bank.kind = Some("banking".to_owned());
        bank.username = None;
        bank.tags = None;
        creds.create(user, bank).await.unwrap();
        creds.toggle_favorite(user, first.id).await.unwrap();

        let all = creds.list(user, &SearchParams::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].label, "Bank");

        let by_kind = SearchParams {
            type_filter: Some("banking".to_owned()),
            ..SearchParams::default()
        };
        assert_eq!(creds.list(user, &by_kind).await.unwrap()[0].label, "Bank");

        let by_text = SearchParams {
            query: Some("OCTO".to_owned()),
            ..SearchParams::default()
        };
        assert_eq!(creds.list(user, &by_text).await.unwrap().len(), 1);

        let favorites = SearchParams {
            favorites_only: true,
            ..SearchParams::default()
        };
        let favs = creds.list(user, &favorites).await.unwrap();
        assert_eq!(favs.len(), 1);
        assert_eq!(favs[0].kind, CredentialKind::Website);

        let bad = SearchParams {
            type_filter: Some("crypto".to_owned()),
            ..SearchParams::default()
        };
        assert!(matches!(creds.list(user, &bad).await, Err(StoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn note_search_ignores_encrypted_content() {
        let (_, notes, _) = stores();
        let user = Uuid::new_v4();
        notes.create(user, wifi()).await.unwrap();

        let by_content = SearchParams {
            query: Some("passphrase".to_owned()),
            ..SearchParams::default()
        };
        assert!(notes.list(user, &by_content).await.unwrap().is_empty());

        let by_tag = SearchParams {
            query: Some("home".to_owned()),
            ..SearchParams::default()
        };
        assert_eq!(notes.list(user, &by_tag).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn touch_sets_last_accessed_only() {
        let (_, notes, _) = stores();
        let user = Uuid::new_v4();
        let n = notes.create(user, wifi()).await.unwrap();
        let touched = notes.touch(user, n.id).await.unwrap();
        assert!(touched.last_accessed.is_some());
        assert_eq!(touched.updated_at, n.updated_at);
    }

    #[tokio::test]
    async fn wrong_key_reveals_placeholder() {
        let (creds, _, backend) = stores();
        let user = Uuid::new_v4();
        let c = creds.create(user, github()).await.unwrap();

        let rotated = CredentialStore::new(
            Arc::new(backend),
            FieldCipher::from_secret(b"a-different-secret").unwrap(),
        );
        let loaded = rotated.get(user, c.id).await.unwrap();
        let detail = rotated.reveal(&loaded);
        assert_eq!(detail.password, DECRYPTION_ERROR_PLACEHOLDER);
        assert_eq!(detail.summary.label, "GitHub");
    }

    #[tokio::test]
    async fn delete_returns_removed_record() {
        let (_, notes, _) = stores();
        let user = Uuid::new_v4();
        let n = notes.create(user, wifi()).await.unwrap();
        let removed = notes.delete(user, n.id).await.unwrap();
        assert_eq!(removed.title, "Home wifi");
        assert_eq!(notes.count(user).await.unwrap(), 0);
    }
}
