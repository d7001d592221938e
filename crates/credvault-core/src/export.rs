//! CSV export of a user's credentials.
//!
//! Passwords and secret keys never appear in the export.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::models::Credential;

const HEADER: [&str; 8] = [
    "TYPE", "LABEL", "USERNAME", "EMAIL", "WEBSITE", "NOTE", "TAGS", "CREATED",
];

/// `credentials_export_{YYYYMMDD}.csv`
#[must_use]
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("credentials_export_{}.csv", now.format("%Y%m%d"))
}

/// Render credentials as CSV, one row each, in the given order.
///
/// # Errors
///
/// Returns [`StoreError::Serialization`] if the CSV writer fails.
pub fn credentials_csv(credentials: &[Credential]) -> Result<Vec<u8>, StoreError> {
    let failed = |e: &dyn std::fmt::Display| StoreError::Serialization {
        key: "export.csv".to_owned(),
        reason: e.to_string(),
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER).map_err(|e| failed(&e))?;
    for c in credentials {
        let created = c.created_at.format("%Y-%m-%d").to_string();
        writer
            .write_record([
                c.kind.as_str(),
                c.label.as_str(),
                c.username.as_deref().unwrap_or_default(),
                c.email.as_deref().unwrap_or_default(),
                c.website_url.as_deref().unwrap_or_default(),
                c.note.as_deref().unwrap_or_default(),
                c.tags.as_deref().unwrap_or_default(),
                created.as_str(),
            ])
            .map_err(|e| failed(&e))?;
    }
    writer.into_inner().map_err(|e| failed(&e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use uuid::Uuid;

    use super::*;
    use crate::models::CredentialKind;

    fn credential(label: &str) -> Credential {
        let created = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        Credential {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            label: label.to_owned(),
            kind: CredentialKind::Email,
            website_url: None,
            username: Some("me".to_owned()),
            email: Some("me@example.com".to_owned()),
            password_encrypted: "v1:c2VjcmV0".to_owned(),
            secret_key_encrypted: Some("v1:a2V5".to_owned()),
            note: Some("line, with comma".to_owned()),
            is_favorite: false,
            tags: Some("mail, personal".to_owned()),
            created_at: created,
            updated_at: created,
            last_accessed: None,
        }
    }

    #[test]
    fn csv_has_header_and_no_secrets() {
        let bytes = credentials_csv(&[credential("Mail")]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("TYPE,LABEL,USERNAME,EMAIL,WEBSITE,NOTE,TAGS,CREATED")
        );
        assert_eq!(
            lines.next(),
            Some("email,Mail,me,me@example.com,,\"line, with comma\",\"mail, personal\",2024-03-09")
        );
        assert!(!text.contains("v1:"));
    }

    #[test]
    fn empty_export_is_header_only() {
        let text = String::from_utf8(credentials_csv(&[]).unwrap()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn filename_uses_date() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(export_filename(now), "credentials_export_20250102.csv");
    }
}
