//! Driven port for the PocketBase REST API.
//!
//! The gateway only consumes a handful of backend capabilities. Keeping them
//! behind this trait lets domain services run against the in-memory fixture
//! or a mock instead of a live PocketBase instance.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::{AuthSession, Credentials, SignUpCredentials, UserRecord};

const DEFAULT_MESSAGE: &str = "Something went wrong while processing your request.";
const ABORT_MESSAGE: &str = "The request was autocancelled.";

/// Failure reported by the PocketBase API or the transport in front of it.
///
/// Transport failures carry status `0`. Timeouts and cancellations also set
/// [`ClientResponseError::is_abort`].
///
/// # Examples
/// ```
/// use pocketgate::domain::ports::ClientResponseError;
/// use serde_json::json;
///
/// let err = ClientResponseError::new("http://pb.local/api/health", 503)
///     .with_message("unavailable")
///     .with_data(json!({ "reason": { "code": "x", "message": "down" } }));
/// assert_eq!(err.status(), 503);
/// assert_eq!(err.to_string(), "unavailable");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientResponseError {
    url: String,
    status: u16,
    message: Option<String>,
    data: Map<String, Value>,
    is_abort: bool,
    original_error: Option<String>,
}

impl ClientResponseError {
    /// Create an error for a response with the given status.
    pub fn new(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status,
            ..Self::default()
        }
    }

    /// Create a transport failure where no response was received.
    pub fn transport(url: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::new(url, 0).with_original_error(cause)
    }

    /// Create a failure for a request that was aborted or timed out.
    pub fn aborted(url: impl Into<String>, cause: impl Into<String>) -> Self {
        let mut error = Self::transport(url, cause);
        error.is_abort = true;
        error
    }

    /// Attach the top-level message reported by the backend.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = (!message.is_empty()).then_some(message);
        self
    }

    /// Attach the `data` payload. Non-object values are ignored.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = map;
        }
        self
    }

    /// Override the reported status code.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Record the failure that caused this error.
    #[must_use]
    pub fn with_original_error(mut self, cause: impl Into<String>) -> Self {
        self.original_error = Some(cause.into());
        self
    }

    /// Mark the request as aborted.
    #[must_use]
    pub fn with_abort(mut self, is_abort: bool) -> Self {
        self.is_abort = is_abort;
        self
    }

    /// Request URL.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// HTTP status, `0` when no response arrived.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Top-level message reported by the backend, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Structured `data` payload (per-field validation errors and extras).
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Whether the request was aborted or timed out.
    pub fn is_abort(&self) -> bool {
        self.is_abort
    }

    /// Description of the underlying failure, if any.
    pub fn original_error(&self) -> Option<&str> {
        self.original_error.as_deref()
    }

    /// Message suitable for logs and status banners.
    pub fn display_message(&self) -> &str {
        match (self.message(), self.is_abort) {
            (Some(message), _) => message,
            (None, true) => ABORT_MESSAGE,
            (None, false) => DEFAULT_MESSAGE,
        }
    }
}

impl std::fmt::Display for ClientResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_message())
    }
}

impl std::error::Error for ClientResponseError {}

/// Body returned by `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthCheckResponse {
    /// Backend-reported status code; `200` when healthy.
    pub code: u16,
    /// Backend-reported status message.
    #[serde(default)]
    pub message: String,
}

impl HealthCheckResponse {
    /// Whether the backend reported itself healthy.
    pub fn is_healthy(&self) -> bool {
        self.code == 200
    }
}

/// Port for the PocketBase capabilities the gateway consumes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PocketBaseApi: Send + Sync {
    /// Base URL the client is configured with.
    fn base_url(&self) -> String;

    /// Create an account in the auth collection.
    async fn create_account(
        &self,
        account: &SignUpCredentials,
    ) -> Result<UserRecord, ClientResponseError>;

    /// Authenticate with email and password.
    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, ClientResponseError>;

    /// Exchange a still-valid token for a fresh session.
    async fn refresh_auth(&self, token: &str) -> Result<AuthSession, ClientResponseError>;

    /// Query the backend health endpoint.
    async fn check_health(&self) -> Result<HealthCheckResponse, ClientResponseError>;

    /// Whether an account with this (normalised) email already exists.
    async fn email_registered(&self, email: &str) -> Result<bool, ClientResponseError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(ClientResponseError::new("u", 400), DEFAULT_MESSAGE)]
    #[case(ClientResponseError::aborted("u", "timeout"), ABORT_MESSAGE)]
    #[case(ClientResponseError::new("u", 400).with_message("Failed."), "Failed.")]
    #[case(ClientResponseError::new("u", 400).with_message(""), DEFAULT_MESSAGE)]
    fn display_message_falls_back(#[case] error: ClientResponseError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    fn transport_errors_have_zero_status() {
        let error = ClientResponseError::transport("http://pb", "connection refused");
        assert_eq!(error.status(), 0);
        assert!(!error.is_abort());
        assert_eq!(error.original_error(), Some("connection refused"));
    }

    #[rstest]
    fn non_object_data_is_ignored() {
        let error = ClientResponseError::new("u", 400).with_data(json!(["not", "an", "object"]));
        assert!(error.data().is_empty());
    }
}
