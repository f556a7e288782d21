//! Authentication error taxonomy and normalisation of backend failures.
//!
//! Backend failures are classified once, at the gateway boundary, into the
//! closed [`AuthError`] set. Both [`classify_sign_up_error`] and
//! [`extract_message`] are total: any input maps to exactly one variant or
//! display string.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::ports::ClientResponseError;

/// Field code PocketBase uses for uniqueness violations.
pub const NOT_UNIQUE_CODE: &str = "validation_not_unique";

/// Message returned when nothing more specific can be found.
pub const FALLBACK_MESSAGE: &str = "Authentication failed";

const USER_EXISTS_MESSAGE: &str = "Email is already registered";
const EMAIL_FIELD: &str = "email";

/// Stable discriminant for [`AuthError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorCode {
    /// The email is already registered.
    UserExists,
    /// The password is shorter than the minimum length.
    PasswordTooShort,
    /// Password and confirmation differ.
    PasswordsDoNotMatch,
    /// The backend rejected one or more sign-up fields.
    SignUpValidationFailed,
    /// Sign-in was rejected or could not reach the backend.
    SignInFailed,
    /// Any failure that does not fit another variant.
    Unknown,
}

impl AuthErrorCode {
    /// Code string used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserExists => "USER_EXISTS",
            Self::PasswordTooShort => "PASSWORD_TOO_SHORT",
            Self::PasswordsDoNotMatch => "PASSWORDS_DO_NOT_MATCH",
            Self::SignUpValidationFailed => "SIGN_UP_VALIDATION_FAILED",
            Self::SignInFailed => "SIGN_IN_FAILED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field-level validation failure reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field name as sent to the backend (`email`, `password`, ...).
    pub field: String,
    /// Backend validation code, empty when absent.
    pub code: String,
    /// Human-readable validation message.
    pub message: String,
}

/// Field errors in the order the backend emitted them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    /// Collect entries shaped `{ "code": "...", "message": "..." }` from a
    /// backend `data` payload. Entries without a non-empty string message are
    /// skipped.
    pub fn from_payload(data: &Map<String, Value>) -> Self {
        let errors = data
            .iter()
            .filter_map(|(field, value)| {
                let entry = value.as_object()?;
                let message = entry.get("message")?.as_str()?;
                if message.is_empty() {
                    return None;
                }
                let code = entry.get("code").and_then(Value::as_str).unwrap_or_default();
                Some(FieldError {
                    field: field.clone(),
                    code: code.to_owned(),
                    message: message.to_owned(),
                })
            })
            .collect();
        Self(errors)
    }

    /// Look up the error for `field`.
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.0.iter().find(|error| error.field == field)
    }

    /// Iterate in backend order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Whether no field errors were reported.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most actionable message: the email field first, then the first field.
    pub fn primary_message(&self) -> Option<&str> {
        self.get(EMAIL_FIELD)
            .or_else(|| self.0.first())
            .map(|error| error.message.as_str())
    }
}

impl FromIterator<FieldError> for FieldErrors {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Why a sign-in attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInFailureKind {
    /// The backend rejected the email/password pair.
    InvalidCredentials,
    /// No usable response: transport failure, timeout, or server error.
    BackendUnreachable,
    /// Any other rejection.
    Rejected,
}

/// Domain authentication errors.
///
/// # Examples
/// ```
/// use pocketgate::domain::{AuthError, AuthErrorCode};
///
/// let err = AuthError::PasswordsDoNotMatch;
/// assert_eq!(err.code(), AuthErrorCode::PasswordsDoNotMatch);
/// assert_eq!(err.message(), "Passwords do not match");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The email is already registered.
    UserExists {
        /// Backend message, or the default when none was given.
        message: String,
    },
    /// The password is shorter than [`super::MIN_PASSWORD_LENGTH`].
    PasswordTooShort,
    /// Password and confirmation differ.
    PasswordsDoNotMatch,
    /// The backend rejected one or more fields.
    SignUpValidationFailed(FieldErrors),
    /// Sign-in failed.
    SignInFailed {
        /// Failure category.
        kind: SignInFailureKind,
        /// Backend message.
        message: String,
    },
    /// Unrecognised failure.
    Unknown {
        /// Best available message.
        message: String,
    },
}

impl AuthError {
    /// `UserExists` with the default message.
    pub fn user_exists() -> Self {
        Self::UserExists {
            message: USER_EXISTS_MESSAGE.to_owned(),
        }
    }

    /// Stable discriminant.
    pub fn code(&self) -> AuthErrorCode {
        match self {
            Self::UserExists { .. } => AuthErrorCode::UserExists,
            Self::PasswordTooShort => AuthErrorCode::PasswordTooShort,
            Self::PasswordsDoNotMatch => AuthErrorCode::PasswordsDoNotMatch,
            Self::SignUpValidationFailed(_) => AuthErrorCode::SignUpValidationFailed,
            Self::SignInFailed { .. } => AuthErrorCode::SignInFailed,
            Self::Unknown { .. } => AuthErrorCode::Unknown,
        }
    }

    /// Human-readable message for display.
    pub fn message(&self) -> &str {
        match self {
            Self::UserExists { message }
            | Self::SignInFailed { message, .. }
            | Self::Unknown { message } => message.as_str(),
            Self::PasswordTooShort => "Password must be at least 8 characters",
            Self::PasswordsDoNotMatch => "Passwords do not match",
            Self::SignUpValidationFailed(fields) => {
                fields.primary_message().unwrap_or(FALLBACK_MESSAGE)
            }
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AuthError {}

/// A failure before classification.
#[derive(Debug)]
pub enum RawFailure {
    /// Already classified; never re-classified.
    Auth(AuthError),
    /// Bare message.
    Text(String),
    /// Backend response failure.
    Response(ClientResponseError),
    /// Any other error.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl From<AuthError> for RawFailure {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<ClientResponseError> for RawFailure {
    fn from(value: ClientResponseError) -> Self {
        Self::Response(value)
    }
}

impl From<String> for RawFailure {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RawFailure {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Map a failed account creation onto the taxonomy.
///
/// A uniqueness violation on `email` wins over any other field error.
///
/// # Examples
/// ```
/// use pocketgate::domain::ports::ClientResponseError;
/// use pocketgate::domain::{AuthErrorCode, RawFailure, classify_sign_up_error};
/// use serde_json::json;
///
/// let raw = RawFailure::from(ClientResponseError::new("http://pb", 400).with_data(json!({
///     "email": { "code": "validation_not_unique", "message": "Value must be unique." }
/// })));
/// assert_eq!(classify_sign_up_error(&raw).code(), AuthErrorCode::UserExists);
/// ```
pub fn classify_sign_up_error(raw: &RawFailure) -> AuthError {
    if let RawFailure::Auth(error) = raw {
        return error.clone();
    }
    if let RawFailure::Response(response) = raw {
        let fields = FieldErrors::from_payload(response.data());
        if let Some(email) = fields.get(EMAIL_FIELD)
            && (email.code == NOT_UNIQUE_CODE || mentions_existing_account(&email.message))
        {
            return AuthError::UserExists {
                message: email.message.clone(),
            };
        }
        if !fields.is_empty() {
            return AuthError::SignUpValidationFailed(fields);
        }
    }
    AuthError::Unknown {
        message: extract_message(raw),
    }
}

/// Map a failed password authentication onto the taxonomy.
pub fn classify_sign_in_error(error: &ClientResponseError) -> AuthError {
    let kind = match error.status() {
        0 => SignInFailureKind::BackendUnreachable,
        400 | 401 | 403 | 404 => SignInFailureKind::InvalidCredentials,
        status if status >= 500 => SignInFailureKind::BackendUnreachable,
        _ => SignInFailureKind::Rejected,
    };
    AuthError::SignInFailed {
        kind,
        message: error.display_message().to_owned(),
    }
}

/// Resolve the single display string for any failure.
///
/// Resolution order: a classified error's own message, a bare string, the
/// top-level message, the payload's `email` field message, the payload's
/// `message` or `error`, the first field message, then
/// [`FALLBACK_MESSAGE`].
///
/// # Examples
/// ```
/// use pocketgate::domain::ports::ClientResponseError;
/// use pocketgate::domain::{RawFailure, extract_message};
/// use serde_json::json;
///
/// let raw = RawFailure::from(ClientResponseError::new("http://pb", 400).with_data(json!({
///     "name": { "code": "x", "message": "too short" },
///     "email": { "code": "y", "message": "taken" }
/// })));
/// assert_eq!(extract_message(&raw), "taken");
/// ```
pub fn extract_message(raw: &RawFailure) -> String {
    let resolved = match raw {
        RawFailure::Auth(error) => Some(error.message().to_owned()),
        RawFailure::Text(text) => non_empty(text).map(str::to_owned),
        RawFailure::Other(error) => {
            let text = error.to_string();
            (!text.is_empty()).then_some(text)
        }
        RawFailure::Response(response) => response
            .message()
            .and_then(non_empty)
            .or_else(|| payload_message(response.data()))
            .map(str::to_owned),
    };
    resolved.unwrap_or_else(|| FALLBACK_MESSAGE.to_owned())
}

fn payload_message(data: &Map<String, Value>) -> Option<&str> {
    field_message(data.get(EMAIL_FIELD))
        .or_else(|| data.get("message").and_then(Value::as_str).and_then(non_empty))
        .or_else(|| data.get("error").and_then(Value::as_str).and_then(non_empty))
        .or_else(|| data.values().find_map(|value| field_message(Some(value))))
}

fn field_message(value: Option<&Value>) -> Option<&str> {
    value?
        .as_object()?
        .get("message")?
        .as_str()
        .and_then(non_empty)
}

fn non_empty(text: &str) -> Option<&str> {
    (!text.is_empty()).then_some(text)
}

fn mentions_existing_account(message: &str) -> bool {
    let lowered = message.to_lowercase();
    ["exist", "already", "in use"]
        .iter()
        .any(|needle| lowered.contains(needle))
}

#[cfg(test)]
mod tests;
