//! User accounts.
//!
//! Accounts live at `users/{id}/account`; a lowercase username index at
//! `users/by-name/{name}` makes usernames unique regardless of case.
//! Passwords are hashed with Argon2id and stored as PHC strings.

use std::sync::Arc;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::Utc;
use credvault_storage::StorageBackend;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::AuthError;
use crate::models::User;
use crate::validate::RegisterInput;

const BY_NAME_PREFIX: &str = "users/by-name/";

fn account_key(id: Uuid) -> String {
    format!("users/{id}/account")
}

fn name_key(username: &str) -> String {
    format!("{BY_NAME_PREFIX}{}", username.to_lowercase())
}

/// Registers, authenticates and loads user accounts.
pub struct UserStore {
    storage: Arc<dyn StorageBackend>,
    /// Held across the check-then-insert of a registration.
    register_lock: Mutex<()>,
}

impl UserStore {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            register_lock: Mutex::new(()),
        }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Invalid`] if a field fails validation.
    /// - [`AuthError::UsernameTaken`] if the name exists in any case.
    /// - [`AuthError::Hashing`] or [`AuthError::Storage`] on internal failure.
    pub async fn register(&self, input: RegisterInput) -> Result<User, AuthError> {
        input.check()?;
        let username = input.username.trim().to_owned();

        // Hash before taking the lock; it is the slow part.
        let password_hash = hash_password(input.password).await?;

        let _guard = self.register_lock.lock().await;
        let index_key = name_key(&username);
        if self.storage.exists(&index_key).await? {
            return Err(AuthError::UsernameTaken { username });
        }

        let user = User {
            id: Uuid::new_v4(),
            username,
            email: input
                .email
                .map(|e| e.trim().to_owned())
                .filter(|e| !e.is_empty()),
            first_name: input.first_name.trim().to_owned(),
            last_name: input.last_name.trim().to_owned(),
            password_hash,
            created_at: Utc::now(),
            last_login: None,
        };

        self.save(&user).await?;
        self.storage
            .put(&index_key, user.id.to_string().as_bytes())
            .await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Check a username and password. Updates `last_login` on success.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or a
    /// wrong password alike.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let Some(id) = self.id_for_name(username.trim()).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        let mut user = match self.get(id).await {
            Ok(user) => user,
            Err(AuthError::UserNotFound) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        if !verify_password(password.to_owned(), user.password_hash.clone()).await? {
            info!(user_id = %user.id, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        user.last_login = Some(Utc::now());
        self.save(&user).await?;
        Ok(user)
    }

    /// Load an account by id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UserNotFound`] if no such account exists.
    pub async fn get(&self, id: Uuid) -> Result<User, AuthError> {
        let key = account_key(id);
        let data = self
            .storage
            .get(&key)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        serde_json::from_slice(&data).map_err(|e| AuthError::Serialization {
            key,
            reason: e.to_string(),
        })
    }

    async fn id_for_name(&self, username: &str) -> Result<Option<Uuid>, AuthError> {
        let Some(raw) = self.storage.get(&name_key(username)).await? else {
            return Ok(None);
        };
        Ok(std::str::from_utf8(&raw)
            .ok()
            .and_then(|s| Uuid::parse_str(s).ok()))
    }

    async fn save(&self, user: &User) -> Result<(), AuthError> {
        let key = account_key(user.id);
        let bytes = serde_json::to_vec(user).map_err(|e| AuthError::Serialization {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.storage.put(&key, &bytes).await?;
        Ok(())
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserStore").finish_non_exhaustive()
    }
}

async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::Hashing {
                reason: e.to_string(),
            })
    })
    .await
    .map_err(|e| AuthError::Hashing {
        reason: format!("blocking task failed: {e}"),
    })?
}

async fn verify_password(password: String, phc: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&phc).map_err(|e| AuthError::Hashing {
            reason: e.to_string(),
        })?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AuthError::Hashing {
        reason: format!("blocking task failed: {e}"),
    })?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use credvault_storage::MemoryBackend;

    use super::*;

    fn store() -> UserStore {
        UserStore::new(Arc::new(MemoryBackend::new()))
    }

    fn alice() -> RegisterInput {
        RegisterInput {
            username: "Alice".to_owned(),
            email: Some("alice@example.com".to_owned()),
            first_name: "Alice".to_owned(),
            last_name: "Liddell".to_owned(),
            password: "through-the-glass".to_owned(),
        }
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let users = store();
        let created = users.register(alice()).await.unwrap();
        assert!(created.password_hash.starts_with("$argon2id$"));

        let logged_in = users.authenticate("alice", "through-the-glass").await.unwrap();
        assert_eq!(logged_in.id, created.id);
        assert!(logged_in.last_login.is_some());
        assert_eq!(users.get(created.id).await.unwrap().username, "Alice");
    }

    #[tokio::test]
    async fn usernames_are_unique_ignoring_case() {
        let users = store();
        users.register(alice()).await.unwrap();
        let mut again = alice();
        again.username = "ALICE".to_owned();
        assert!(matches!(
            users.register(again).await,
            Err(AuthError::UsernameTaken { .. })
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let users = store();
        users.register(alice()).await.unwrap();
        assert!(matches!(
            users.authenticate("alice", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            users.authenticate("bob", "through-the-glass").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn invalid_registration_is_rejected() {
        let mut input = alice();
        input.password = "short".to_owned();
        assert!(matches!(
            store().register(input).await,
            Err(AuthError::Invalid(_))
        ));
    }
}
