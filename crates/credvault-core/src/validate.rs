//! Input validation for credentials, notes and registrations.
//!
//! Each `*Input` is what a client sends; `validate()` trims and normalises
//! it and returns either the cleaned value or every field error at once.

use serde::Deserialize;

use crate::error::FieldErrors;
use crate::models::{CredentialKind, NoteKind};

const MAX_LABEL: usize = 255;
const MAX_URL: usize = 200;
const MAX_TAGS_LEN: usize = 500;
const MAX_TAGS: usize = 10;
const MAX_USERNAME: usize = 150;

/// Minimum length for both account passwords and stored credential passwords.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Credential fields as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialInput {
    pub label: String,
    #[serde(rename = "type", alias = "credential_type")]
    pub kind: Option<String>,
    pub website_url: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub secret_key: Option<String>,
    pub note: Option<String>,
    pub is_favorite: Option<bool>,
    pub tags: Option<String>,
}

/// A credential that passed validation. `password` and `secret_key` are
/// plaintext and may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCredential {
    pub label: String,
    pub kind: CredentialKind,
    pub website_url: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
    pub secret_key: String,
    pub note: Option<String>,
    pub is_favorite: Option<bool>,
    pub tags: Option<String>,
}

impl CredentialInput {
    /// Validate and normalise.
    ///
    /// # Errors
    ///
    /// Returns every field that failed, keyed by field name.
    pub fn validate(self) -> Result<ValidCredential, FieldErrors> {
        let mut errors = FieldErrors::new();

        let label = self.label.trim().to_owned();
        if label.is_empty() {
            errors.add("label", "This field is required.");
        } else if label.chars().count() > MAX_LABEL {
            errors.add("label", too_long(MAX_LABEL));
        }

        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") => CredentialKind::default(),
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                errors.add("type", format!("Select a valid choice. {raw} is not one of the available choices."));
                CredentialKind::default()
            }),
        };

        let website_url = optional_text(self.website_url);
        if let Some(url) = &website_url {
            if url.chars().count() > MAX_URL {
                errors.add("website_url", too_long(MAX_URL));
            } else if !is_valid_url(url) {
                errors.add("website_url", "Enter a valid URL.");
            }
        }

        let username = optional_text(self.username);
        if username.as_ref().is_some_and(|u| u.chars().count() > MAX_LABEL) {
            errors.add("username", too_long(MAX_LABEL));
        }

        let email = optional_text(self.email);
        if let Some(e) = &email {
            check_email(e, &mut errors);
        }

        let password = self.password.unwrap_or_default();
        if !password.is_empty() && password.chars().count() < MIN_PASSWORD_LEN {
            errors.add("password", "Password must be at least 8 characters long.");
        }

        let tags = match normalize_tags(self.tags.as_deref()) {
            Ok(tags) => tags,
            Err(message) => {
                errors.add("tags", message);
                None
            }
        };

        errors.into_result()?;

        Ok(ValidCredential {
            label,
            kind,
            website_url,
            username,
            email,
            password,
            secret_key: self.secret_key.unwrap_or_default(),
            note: optional_text(self.note),
            is_favorite: self.is_favorite,
            tags,
        })
    }
}

/// Secure note fields as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
    #[serde(rename = "type", alias = "note_type")]
    pub kind: Option<String>,
    pub is_favorite: Option<bool>,
    pub tags: Option<String>,
}

/// A note that passed validation. `content` is plaintext and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidNote {
    pub title: String,
    pub content: String,
    pub kind: NoteKind,
    pub is_favorite: Option<bool>,
    pub tags: Option<String>,
}

impl NoteInput {
    /// Validate and normalise.
    ///
    /// # Errors
    ///
    /// Returns every field that failed, keyed by field name.
    pub fn validate(self) -> Result<ValidNote, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim().to_owned();
        if title.is_empty() {
            errors.add("title", "This field is required.");
        } else if title.chars().count() > MAX_LABEL {
            errors.add("title", too_long(MAX_LABEL));
        }

        if self.content.trim().is_empty() {
            errors.add("content", "This field is required.");
        }

        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("") => NoteKind::default(),
            Some(raw) => NoteKind::ALL
                .into_iter()
                .find(|k| k.as_str() == raw)
                .unwrap_or_else(|| {
                    errors.add("type", format!("Select a valid choice. {raw} is not one of the available choices."));
                    NoteKind::default()
                }),
        };

        let tags = match normalize_tags(self.tags.as_deref()) {
            Ok(tags) => tags,
            Err(message) => {
                errors.add("tags", message);
                None
            }
        };

        errors.into_result()?;

        Ok(ValidNote {
            title,
            content: self.content,
            kind,
            is_favorite: self.is_favorite,
            tags,
        })
    }
}

/// Account registration fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterInput {
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegisterInput {
    /// Check everything except uniqueness, which needs the store.
    ///
    /// # Errors
    ///
    /// Returns every field that failed, keyed by field name.
    pub fn check(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", "This field is required.");
        } else if username.chars().count() > MAX_USERNAME {
            errors.add("username", too_long(MAX_USERNAME));
        } else if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }

        if let Some(email) = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            check_email(email, &mut errors);
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                "This password is too short. It must contain at least 8 characters.",
            );
        } else if self.password.eq_ignore_ascii_case(username) {
            errors.add("password", "The password is too similar to the username.");
        }

        errors.into_result()
    }
}

/// Split, trim and re-join tags as `"a, b, c"`.
///
/// Blank input gives `Ok(None)`.
///
/// # Errors
///
/// Returns a message when the raw string is too long or holds more than ten
/// tags.
pub fn normalize_tags(raw: Option<&str>) -> Result<Option<String>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    if raw.chars().count() > MAX_TAGS_LEN {
        return Err(too_long(MAX_TAGS_LEN));
    }
    let tags: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if tags.len() > MAX_TAGS {
        return Err("Maximum 10 tags allowed.".to_owned());
    }
    if tags.is_empty() {
        Ok(None)
    } else {
        Ok(Some(tags.join(", ")))
    }
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn too_long(max: usize) -> String {
    format!("Ensure this value has at most {max} characters.")
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.chars().count() > MAX_LABEL {
        errors.add("email", too_long(MAX_LABEL));
    } else if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address.");
    }
}

fn is_valid_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    let Some(rest) = rest else {
        return false;
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    !host.is_empty() && !url.chars().any(char::is_whitespace)
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn credential(label: &str) -> CredentialInput {
        CredentialInput {
            label: label.to_owned(),
            ..CredentialInput::default()
        }
    }

    #[test]
    fn minimal_credential_defaults_to_other() {
        let valid = credential("  GitHub  ").validate().unwrap();
        assert_eq!(valid.label, "GitHub");
        assert_eq!(valid.kind, CredentialKind::Other);
        assert!(valid.password.is_empty());
        assert_eq!(valid.tags, None);
    }

    #[test]
    fn all_errors_are_reported_together() {
        let input = CredentialInput {
            label: "   ".to_owned(),
            kind: Some("crypto".to_owned()),
            website_url: Some("ftp://example.com".to_owned()),
            email: Some("not-an-email".to_owned()),
            password: Some("short".to_owned()),
            ..CredentialInput::default()
        };
        let errors = input.validate().unwrap_err();
        for field in ["label", "type", "website_url", "email", "password"] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }
    }

    #[test]
    fn url_requires_scheme_and_host() {
        assert!(is_valid_url("https://github.com/login"));
        assert!(is_valid_url("http://localhost:8080"));
        assert!(!is_valid_url("github.com"));
        assert!(!is_valid_url("https://"));
        assert!(!is_valid_url("https://exa mple.com"));
    }

    #[test]
    fn email_needs_dotted_domain() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@localhost"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@b@c.co"));
    }

    #[test]
    fn tags_are_normalised() {
        assert_eq!(
            normalize_tags(Some(" dev ,, ops,prod ")).unwrap().as_deref(),
            Some("dev, ops, prod")
        );
        assert_eq!(normalize_tags(Some(" , ")).unwrap(), None);
        assert_eq!(normalize_tags(None).unwrap(), None);
    }

    #[test]
    fn more_than_ten_tags_is_rejected() {
        let raw = (0..11).map(|i| format!("t{i}")).collect::<Vec<_>>().join(",");
        assert_eq!(normalize_tags(Some(&raw)).unwrap_err(), "Maximum 10 tags allowed.");
        let ten = (0..10).map(|i| format!("t{i}")).collect::<Vec<_>>().join(",");
        assert!(normalize_tags(Some(&ten)).unwrap().is_some());
    }

    #[test]
    fn note_requires_title_and_content() {
        let errors = NoteInput::default().validate().unwrap_err();
        assert!(errors.get("title").is_some());
        assert!(errors.get("content").is_some());

        let valid = NoteInput {
            title: "Wifi".to_owned(),
            content: "door code 1234".to_owned(),
            kind: Some("technical".to_owned()),
            ..NoteInput::default()
        }
        .validate()
        .unwrap();
        assert_eq!(valid.kind, NoteKind::Technical);
    }

    #[test]
    fn registration_rules() {
        let mut input = RegisterInput {
            username: "alice".to_owned(),
            password: "correct horse".to_owned(),
            ..RegisterInput::default()
        };
        assert!(input.check().is_ok());

        input.username = "al ice".to_owned();
        assert!(input.check().unwrap_err().get("username").is_some());

        input.username = "alicealice".to_owned();
        input.password = "ALICEALICE".to_owned();
        assert!(input.check().unwrap_err().get("password").is_some());

        input.password = "short".to_owned();
        assert!(input.check().unwrap_err().get("password").is_some());
    }

    #[test]
    fn input_deserializes_type_alias() {
        let input: CredentialInput =
            serde_json::from_str(r#"{"label":"x","credential_type":"api"}"#).unwrap();
        assert_eq!(input.validate().unwrap().kind, CredentialKind::Api);
    }
}
