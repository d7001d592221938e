//! Dashboard statistics.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::activity::ActivityLog;
use crate::error::StoreError;
use crate::models::{ActivityEntry, CredentialKind, CredentialSummary, NoteSummary};
use crate::search::SearchParams;
use crate::vault::{CredentialStore, NoteStore};

const RECENT: usize = 5;
const TOP_TYPES: usize = 5;

/// How many credentials a user has of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: CredentialKind,
    pub label: &'static str,
    pub count: usize,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_credentials: usize,
    pub total_notes: usize,
    pub favorite_credentials: usize,
    pub favorite_notes: usize,
    pub recent_activities: Vec<ActivityEntry>,
    pub recent_credentials: Vec<CredentialSummary>,
    pub recent_notes: Vec<NoteSummary>,
    pub credential_types: Vec<TypeCount>,
}

impl DashboardStats {
    /// Gather stats for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any underlying read fails.
    pub async fn gather(
        user: Uuid,
        credentials: &CredentialStore,
        notes: &NoteStore,
        activity: &ActivityLog,
    ) -> Result<Self, StoreError> {
        let all = SearchParams::default();
        let creds = credentials.list(user, &all).await?;
        let note_list = notes.list(user, &all).await?;

        Ok(Self {
            total_credentials: creds.len(),
            total_notes: note_list.len(),
            favorite_credentials: creds.iter().filter(|c| c.is_favorite).count(),
            favorite_notes: note_list.iter().filter(|n| n.is_favorite).count(),
            recent_activities: activity.recent(user, RECENT).await?,
            recent_credentials: creds.iter().take(RECENT).map(CredentialSummary::from).collect(),
            recent_notes: note_list.iter().take(RECENT).map(NoteSummary::from).collect(),
            credential_types: top_kinds(creds.iter().map(|c| c.kind)),
        })
    }
}

/// Most common kinds, count descending, ties by wire name.
fn top_kinds(kinds: impl Iterator<Item = CredentialKind>) -> Vec<TypeCount> {
    let mut counts: HashMap<CredentialKind, usize> = HashMap::new();
    for kind in kinds {
        let entry = counts.entry(kind).or_default();
        *entry = entry.saturating_add(1);
    }
    let mut ranked: Vec<TypeCount> = counts
        .into_iter()
        .map(|(kind, count)| TypeCount {
            kind,
            label: kind.label(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.kind.as_str().cmp(b.kind.as_str())));
    ranked.truncate(TOP_TYPES);
    ranked
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use credvault_storage::MemoryBackend;

    use super::*;
    use crate::activity::ClientInfo;
    use crate::cipher::FieldCipher;
    use crate::models::ActivityAction;
    use crate::validate::{CredentialInput, NoteInput};

    #[test]
    fn top_kinds_ranks_and_truncates() {
        use CredentialKind::{Api, Banking, Email, Other, Personal, Server, Website};
        let kinds = [Website, Website, Api, Api, Banking, Email, Other, Personal, Server];
        let ranked = top_kinds(kinds.into_iter());
        assert_eq!(ranked.len(), 5);
        assert_eq!((ranked[0].kind, ranked[0].count), (Api, 2));
        assert_eq!((ranked[1].kind, ranked[1].count), (Website, 2));
        assert_eq!(ranked[2].kind, Banking);
        assert_eq!(ranked[2].label, "Banking/Finance");
    }

    #[tokio::test]
    async fn gather_counts_and_recent_items() {
        let backend = Arc::new(MemoryBackend::new());
        let cipher = FieldCipher::from_secret(b"dash").unwrap();
        let creds = CredentialStore::new(backend.clone(), cipher.clone());
        let notes = NoteStore::new(backend.clone(), cipher);
        let activity = ActivityLog::new(backend);
        let user = Uuid::new_v4();

        for i in 0..7 {
            let c = creds
                .create(
                    user,
                    CredentialInput {
                        label: format!("site {i}"),
                        kind: Some("website".to_owned()),
                        ..CredentialInput::default()
                    },
                )
                .await
                .unwrap();
            if i % 3 == 0 {
                creds.toggle_favorite(user, c.id).await.unwrap();
            }
        }
        notes
            .create(
                user,
                NoteInput {
                    title: "n".to_owned(),
                    content: "c".to_owned(),
                    ..NoteInput::default()
                },
            )
            .await
            .unwrap();
        activity
            .log(user, ActivityAction::Login, "User logged in from unknown", &ClientInfo::default())
            .await
            .unwrap();

        let stats = DashboardStats::gather(user, &creds, &notes, &activity).await.unwrap();
        assert_eq!(stats.total_credentials, 7);
        assert_eq!(stats.favorite_credentials, 3);
        assert_eq!(stats.total_notes, 1);
        assert_eq!(stats.favorite_notes, 0);
        assert_eq!(stats.recent_credentials.len(), 5);
        assert_eq!(stats.recent_activities.len(), 1);
        assert_eq!(stats.credential_types[0].count, 7);
    }
}
