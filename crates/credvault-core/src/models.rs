//! Domain types: users, credentials, secure notes, activity entries.
//!
//! Stored records keep secret fields in their encrypted form
//! (`*_encrypted`). The `*Summary` types never carry secrets; the `*Detail`
//! types carry decrypted values and exist only for the lifetime of a single
//! response.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Kinds ────────────────────────────────────────────────────────────

/// Category of a credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
    Website,
    Email,
    Social,
    Banking,
    Work,
    Personal,
    Server,
    Api,
    #[default]
    Other,
}

impl CredentialKind {
    /// Every kind, in display order.
    pub const ALL: [Self; 9] = [
        Self::Website,
        Self::Email,
        Self::Social,
        Self::Banking,
        Self::Work,
        Self::Personal,
        Self::Server,
        Self::Api,
        Self::Other,
    ];

    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Email => "email",
            Self::Social => "social",
            Self::Banking => "banking",
            Self::Work => "work",
            Self::Personal => "personal",
            Self::Server => "server",
            Self::Api => "api",
            Self::Other => "other",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Website => "Website/App",
            Self::Email => "Email Account",
            Self::Social => "Social Media",
            Self::Banking => "Banking/Finance",
            Self::Work => "Work Related",
            Self::Personal => "Personal",
            Self::Server => "Server/Database",
            Self::Api => "API Key",
            Self::Other => "Other",
        }
    }

    /// Font Awesome icon class.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Website => "fas fa-globe",
            Self::Email => "fas fa-envelope",
            Self::Social => "fab fa-twitter",
            Self::Banking => "fas fa-university",
            Self::Work => "fas fa-briefcase",
            Self::Personal => "fas fa-user",
            Self::Server => "fas fa-server",
            Self::Api => "fas fa-key",
            Self::Other => "fas fa-folder",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown credential type: {s}"))
    }
}

/// Category of a secure note.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Personal,
    Work,
    Financial,
    Medical,
    Legal,
    Technical,
    Other,
}

impl NoteKind {
    /// Every kind, in display order.
    pub const ALL: [Self; 7] = [
        Self::Personal,
        Self::Work,
        Self::Financial,
        Self::Medical,
        Self::Legal,
        Self::Technical,
        Self::Other,
    ];

    /// Wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Work => "work",
            Self::Financial => "financial",
            Self::Medical => "medical",
            Self::Legal => "legal",
            Self::Technical => "technical",
            Self::Other => "other",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Personal => "Personal",
            Self::Work => "Work",
            Self::Financial => "Financial",
            Self::Medical => "Medical",
            Self::Legal => "Legal",
            Self::Technical => "Technical",
            Self::Other => "Other",
        }
    }

    /// Font Awesome icon class.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Personal => "fas fa-user",
            Self::Work => "fas fa-briefcase",
            Self::Financial => "fas fa-dollar-sign",
            Self::Medical => "fas fa-heartbeat",
            Self::Legal => "fas fa-gavel",
            Self::Technical => "fas fa-code",
            Self::Other => "fas fa-sticky-note",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a user did, recorded in their activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Login,
    Logout,
    CreateCredential,
    ViewCredential,
    UpdateCredential,
    DeleteCredential,
    CreateNote,
    ViewNote,
    UpdateNote,
    DeleteNote,
    ExportData,
}

impl ActivityAction {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Login => "User Login",
            Self::Logout => "User Logout",
            Self::CreateCredential => "Created Credential",
            Self::ViewCredential => "Viewed Credential",
            Self::UpdateCredential => "Updated Credential",
            Self::DeleteCredential => "Deleted Credential",
            Self::CreateNote => "Created Note",
            Self::ViewNote => "Viewed Note",
            Self::UpdateNote => "Updated Note",
            Self::DeleteNote => "Deleted Note",
            Self::ExportData => "Exported Data",
        }
    }
}

// ── Users ────────────────────────────────────────────────────────────

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// Argon2id PHC string. Never serialized to clients.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Account data safe to send to the account's owner.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserInfo {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            email: u.email.clone(),
            first_name: u.first_name.clone(),
            last_name: u.last_name.clone(),
            created_at: u.created_at,
            last_login: u.last_login,
        }
    }
}

// ── Credentials ──────────────────────────────────────────────────────

/// A stored credential. Secret fields are ciphertext tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub label: String,
    pub kind: CredentialKind,
    pub website_url: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_encrypted: String,
    pub secret_key_encrypted: Option<String>,
    pub note: Option<String>,
    pub is_favorite: bool,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl Credential {
    /// Tags as a list, trimmed, empties dropped.
    #[must_use]
    pub fn tags_list(&self) -> Vec<String> {
        split_tags(self.tags.as_deref())
    }

    /// Icon for this credential's kind.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        self.kind.icon()
    }

    /// Whether `needle` (already lowercased) appears in any searchable
    /// plaintext field.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        contains_ci(&self.label, needle)
            || self.username.as_deref().is_some_and(|v| contains_ci(v, needle))
            || self.email.as_deref().is_some_and(|v| contains_ci(v, needle))
            || self.note.as_deref().is_some_and(|v| contains_ci(v, needle))
            || self.tags.as_deref().is_some_and(|v| contains_ci(v, needle))
    }

    /// `"{label} ({kind})"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.label, self.kind)
    }
}

/// Credential fields without any secret.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialSummary {
    pub id: Uuid,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: CredentialKind,
    pub icon: &'static str,
    pub website_url: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub note: Option<String>,
    pub is_favorite: bool,
    pub tags: Vec<String>,
    pub has_password: bool,
    pub has_secret_key: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl From<&Credential> for CredentialSummary {
    fn from(c: &Credential) -> Self {
        Self {
            id: c.id,
            label: c.label.clone(),
            kind: c.kind,
            icon: c.icon(),
            website_url: c.website_url.clone(),
            username: c.username.clone(),
            email: c.email.clone(),
            note: c.note.clone(),
            is_favorite: c.is_favorite,
            tags: c.tags_list(),
            has_password: !c.password_encrypted.is_empty(),
            has_secret_key: c.secret_key_encrypted.as_deref().is_some_and(|s| !s.is_empty()),
            created_at: c.created_at,
            updated_at: c.updated_at,
            last_accessed: c.last_accessed,
        }
    }
}

/// A credential with its secrets decrypted.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialDetail {
    #[serde(flatten)]
    pub summary: CredentialSummary,
    pub password: String,
    pub secret_key: String,
}

// ── Notes ────────────────────────────────────────────────────────────

/// A stored secure note. The body is a ciphertext token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureNote {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub kind: NoteKind,
    pub content_encrypted: String,
    pub is_favorite: bool,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl SecureNote {
    /// Tags as a list, trimmed, empties dropped.
    #[must_use]
    pub fn tags_list(&self) -> Vec<String> {
        split_tags(self.tags.as_deref())
    }

    /// Icon for this note's kind.
    #[must_use]
    pub fn icon(&self) -> &'static str {
        self.kind.icon()
    }

    /// Title and tags only; the encrypted body is never searched.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        contains_ci(&self.title, needle)
            || self.tags.as_deref().is_some_and(|v| contains_ci(v, needle))
    }
}

/// Note fields without the body.
#[derive(Debug, Clone, Serialize)]
pub struct NoteSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub icon: &'static str,
    pub is_favorite: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl From<&SecureNote> for NoteSummary {
    fn from(n: &SecureNote) -> Self {
        Self {
            id: n.id,
            title: n.title.clone(),
            kind: n.kind,
            icon: n.icon(),
            is_favorite: n.is_favorite,
            tags: n.tags_list(),
            created_at: n.created_at,
            updated_at: n.updated_at,
            last_accessed: n.last_accessed,
        }
    }
}

/// A note with its body decrypted.
#[derive(Debug, Clone, Serialize)]
pub struct NoteDetail {
    #[serde(flatten)]
    pub summary: NoteSummary,
    pub content: String,
}

// ── Activity ─────────────────────────────────────────────────────────

/// One entry in a user's activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: ActivityAction,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ── Helpers ──────────────────────────────────────────────────────────

fn split_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}
