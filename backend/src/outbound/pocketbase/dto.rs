//! DTOs for the PocketBase REST payloads the adapter exchanges.
//!
//! Request bodies borrow from domain credentials; response bodies decode into
//! transport shapes first and are mapped into domain values in one pass.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AuthSession, Credentials, SignUpCredentials, UserRecord};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateAccountDto<'a> {
    pub(super) email: &'a str,
    pub(super) password: &'a str,
    pub(super) password_confirm: &'a str,
    pub(super) email_visibility: bool,
}

impl<'a> From<&'a SignUpCredentials> for CreateAccountDto<'a> {
    fn from(account: &'a SignUpCredentials) -> Self {
        Self {
            email: account.credentials().email(),
            password: account.credentials().password(),
            password_confirm: account.password_confirm(),
            email_visibility: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct AuthWithPasswordDto<'a> {
    pub(super) identity: &'a str,
    pub(super) password: &'a str,
}

impl<'a> From<&'a Credentials> for AuthWithPasswordDto<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        Self {
            identity: credentials.email(),
            password: credentials.password(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct AuthResponseDto {
    pub(super) token: String,
    pub(super) record: UserRecord,
}

impl AuthResponseDto {
    pub(super) fn into_session(self) -> AuthSession {
        AuthSession::new(self.token, self.record)
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct RecordListDto {
    #[serde(default)]
    pub(super) items: Vec<IgnoredAny>,
}

/// Error envelope `{ status|code, message, data }`; the status is taken from
/// the HTTP response instead.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorBodyDto {
    #[serde(default)]
    pub(super) message: String,
    #[serde(default)]
    pub(super) data: Value,
}
