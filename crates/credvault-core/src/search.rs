//! Cross-collection search and favorites.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{FieldErrors, StoreError};
use crate::models::{Credential, CredentialKind, SecureNote};
use crate::vault::{CredentialStore, NoteStore};

/// Search criteria shared by listings and the search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Case-insensitive substring.
    pub query: Option<String>,
    /// A credential type, or `"all"`.
    pub type_filter: Option<String>,
    pub favorites_only: bool,
}

impl SearchParams {
    /// The trimmed, lowercased query, if there is one.
    #[must_use]
    pub fn needle(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    /// The credential type to filter on. Blank and `"all"` mean none.
    ///
    /// # Errors
    ///
    /// Returns a `type_filter` field error for an unknown type.
    pub fn kind_filter(&self) -> Result<Option<CredentialKind>, FieldErrors> {
        match self.type_filter.as_deref().map(str::trim) {
            None | Some("" | "all") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| FieldErrors::single("type_filter", format!("Unknown credential type: {raw}"))),
        }
    }
}

/// Matching records from both collections.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub credentials: Vec<Credential>,
    pub notes: Vec<SecureNote>,
}

impl SearchResults {
    #[must_use]
    pub fn total(&self) -> usize {
        self.credentials.len().saturating_add(self.notes.len())
    }
}

/// Runs searches over a user's credentials and notes.
#[derive(Debug, Clone)]
pub struct SearchService {
    credentials: Arc<CredentialStore>,
    notes: Arc<NoteStore>,
}

impl SearchService {
    #[must_use]
    pub fn new(credentials: Arc<CredentialStore>, notes: Arc<NoteStore>) -> Self {
        Self { credentials, notes }
    }

    /// Search both collections. The type filter narrows credentials only.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for an unknown type filter, or a
    /// storage error.
    pub async fn search_all(&self, user: Uuid, params: &SearchParams) -> Result<SearchResults, StoreError> {
        Ok(SearchResults {
            credentials: self.credentials.list(user, params).await?,
            notes: self.notes.list(user, params).await?,
        })
    }

    /// Every favorite credential and note.
    ///
    /// # Errors
    ///
    /// Returns a storage error if either listing fails.
    pub async fn favorites(&self, user: Uuid) -> Result<SearchResults, StoreError> {
        let params = SearchParams {
            favorites_only: true,
            ..SearchParams::default()
        };
        self.search_all(user, &params).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use credvault_storage::MemoryBackend;

    use super::*;
    use crate::cipher::FieldCipher;
    use crate::validate::{CredentialInput, NoteInput};

    fn service() -> SearchService {
        let backend = Arc::new(MemoryBackend::new());
        let cipher = FieldCipher::from_secret(b"search-secret").unwrap();
        SearchService::new(
            Arc::new(CredentialStore::new(backend.clone(), cipher.clone())),
            Arc::new(NoteStore::new(backend, cipher)),
        )
    }

    #[test]
    fn blank_and_all_mean_no_filter() {
        for raw in [None, Some(""), Some("all"), Some("  ")] {
            let params = SearchParams {
                type_filter: raw.map(str::to_owned),
                ..SearchParams::default()
            };
            assert_eq!(params.kind_filter().unwrap(), None);
        }
        let params = SearchParams {
            type_filter: Some("server".to_owned()),
            ..SearchParams::default()
        };
        assert_eq!(params.kind_filter().unwrap(), Some(CredentialKind::Server));
    }

    #[test]
    fn needle_is_trimmed_and_lowercased() {
        let params = SearchParams {
            query: Some("  GitHub ".to_owned()),
            ..SearchParams::default()
        };
        assert_eq!(params.needle().as_deref(), Some("github"));
        assert_eq!(SearchParams::default().needle(), None);
    }

    #[tokio::test]
    async fn search_spans_both_collections() {
        let search = service();
        let user = Uuid::new_v4();
        search
            .credentials
            .create(
                user,
                CredentialInput {
                    label: "Work VPN".to_owned(),
                    kind: Some("work".to_owned()),
                    ..CredentialInput::default()
                },
            )
            .await
            .unwrap();
        let note = search
            .notes
            .create(
                user,
                NoteInput {
                    title: "VPN recovery codes".to_owned(),
                    content: "1111 2222".to_owned(),
                    ..NoteInput::default()
                },
            )
            .await
            .unwrap();

        let params = SearchParams {
            query: Some("vpn".to_owned()),
            ..SearchParams::default()
        };
        let results = search.search_all(user, &params).await.unwrap();
        assert_eq!(results.total(), 2);

        // Type filter narrows credentials, notes still match on text.
        let params = SearchParams {
            query: Some("vpn".to_owned()),
            type_filter: Some("banking".to_owned()),
            favorites_only: false,
        };
        let results = search.search_all(user, &params).await.unwrap();
        assert!(results.credentials.is_empty());
        assert_eq!(results.notes.len(), 1);

        search.notes.toggle_favorite(user, note.id).await.unwrap();
        let favs = search.favorites(user).await.unwrap();
        assert!(favs.credentials.is_empty());
        assert_eq!(favs.notes[0].id, note.id);
    }
}
