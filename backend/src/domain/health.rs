//! Backend health status values.

use std::fmt;

use serde::Serialize;

use super::ports::ClientResponseError;

/// Status code recorded when a failure did not come from a backend response.
pub const SYNTHETIC_FAILURE_STATUS: u16 = 500;

/// Details of an unhealthy backend observation.
///
/// # Examples
/// ```
/// use pocketgate::domain::UnhealthyBackend;
///
/// let unhealthy = UnhealthyBackend::new("down", 503, "http://pb.local");
/// assert_eq!(
///     unhealthy.to_string(),
///     "POCKETBASE_URL: http://pb.local. Status: 503. Message: down"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnhealthyBackend {
    reason: String,
    status: u16,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<String>,
}

impl UnhealthyBackend {
    /// Build an observation from its parts.
    pub fn new(reason: impl Into<String>, status: u16, url: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            status,
            url: url.into(),
            cause: None,
        }
    }

    /// Wrap a backend response failure directly.
    pub fn from_response(error: &ClientResponseError) -> Self {
        Self {
            reason: error.display_message().to_owned(),
            status: error.status(),
            url: error.url().to_owned(),
            cause: error.original_error().map(str::to_owned),
        }
    }

    /// Wrap a failure that carried no backend response as a synthetic `500`.
    pub fn synthetic(url: impl Into<String>, cause: impl Into<String>) -> Self {
        let cause = cause.into();
        Self {
            reason: cause.clone(),
            status: SYNTHETIC_FAILURE_STATUS,
            url: url.into(),
            cause: Some(cause),
        }
    }

    /// Human-readable reason.
    pub fn reason(&self) -> &str {
        self.reason.as_str()
    }

    /// Status code of the failure source.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// URL of the failure source.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Underlying failure when it was not a plain backend response.
    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }
}

impl fmt::Display for UnhealthyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "POCKETBASE_URL: {}. Status: {}. Message: {}",
            self.url, self.status, self.reason
        )
    }
}

/// Result of one health tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// The backend answered its health check.
    Healthy,
    /// The backend failed its health check.
    Unhealthy(UnhealthyBackend),
}

impl HealthStatus {
    /// Whether this is [`HealthStatus::Healthy`].
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Failure details when unhealthy.
    pub fn unhealthy(&self) -> Option<&UnhealthyBackend> {
        match self {
            Self::Healthy => None,
            Self::Unhealthy(details) => Some(details),
        }
    }
}
