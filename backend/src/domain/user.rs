//! Identity records supplied by the backend.
//!
//! These types are passthroughs: the gateway stores and forwards them but does
//! not interpret or validate fields beyond decoding.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// User record returned by PocketBase auth collections.
///
/// Timestamps are kept as the backend's own strings
/// (`2024-01-01 10:00:00.000Z`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Record identifier.
    pub id: String,
    /// Account email. Hidden emails decode as empty.
    #[serde(default)]
    pub email: String,
    /// Whether the email has been verified.
    #[serde(default)]
    pub verified: bool,
    /// Whether the email is visible to other users.
    #[serde(default)]
    pub email_visibility: bool,
    /// Creation timestamp.
    #[serde(default)]
    pub created: String,
    /// Last update timestamp.
    #[serde(default)]
    pub updated: String,
    /// Owning collection id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    /// Owning collection name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    /// Optional username field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Authenticated session: the auth token plus the record it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    token: Zeroizing<String>,
    record: UserRecord,
}

impl AuthSession {
    /// Build a session from a token and its record.
    pub fn new(token: impl Into<String>, record: UserRecord) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
            record,
        }
    }

    /// Raw auth token.
    pub fn token(&self) -> &str {
        self.token.as_str()
    }

    /// Authenticated user record.
    pub fn record(&self) -> &UserRecord {
        &self.record
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("record", &self.record)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn decodes_pocketbase_record_shape() {
        let record: UserRecord = serde_json::from_value(json!({
            "id": "r1",
            "collectionId": "_pb_users_auth_",
            "collectionName": "users",
            "email": "user@example.com",
            "emailVisibility": true,
            "verified": false,
            "created": "2024-01-01 10:00:00.000Z",
            "updated": "2024-01-01 10:00:00.000Z",
            "avatar": ""
        }))
        .expect("record decodes");

        assert_eq!(record.email, "user@example.com");
        assert!(record.email_visibility);
        assert_eq!(record.collection_name.as_deref(), Some("users"));
        assert!(record.username.is_none());
    }

    #[rstest]
    fn debug_output_redacts_token() {
        let session = AuthSession::new("secret-token", UserRecord::default());
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-token"));
    }
}
