//! Health endpoints for the gateway and its PocketBase backend.
//!
//! `GET /api/health` runs one backend check and reports on the gateway
//! process itself; `GET /api/health/backend` reports the monitor's last
//! recorded backend status. Both responses are `Cache-Control: no-store`.

use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, HttpResponseBuilder, ResponseError, get, web};
use serde::Serialize;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::domain::{HealthMonitor, HealthStatus, TickOutcome, UnhealthyBackend};

const NO_STORE: &str = "no-store";
const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";

/// Health status label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthLabel {
    /// Working normally.
    Healthy,
    /// Failing.
    Unhealthy,
    /// No observation yet.
    Unknown,
}

/// Gateway process status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ServerHealth {
    /// `HEALTHY`, or `UNHEALTHY` when the handler could not run.
    #[schema(example = "HEALTHY")]
    pub status: HealthLabel,
    /// Error code when unhealthy, otherwise `null`.
    pub error: Option<String>,
}

/// Body of `GET /api/health`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Gateway process status.
    pub server: ServerHealth,
}

impl HealthResponse {
    fn healthy() -> Self {
        Self {
            server: ServerHealth {
                status: HealthLabel::Healthy,
                error: None,
            },
        }
    }

    fn unhealthy() -> Self {
        Self {
            server: ServerHealth {
                status: HealthLabel::Unhealthy,
                error: Some(UNKNOWN_ERROR.to_owned()),
            },
        }
    }
}

/// Details of the last failed backend check.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackendFailure {
    /// Human-readable reason.
    pub reason: String,
    /// Status of the failure source; `0` for transport failures, `500` when
    /// synthesised.
    pub status: u16,
    /// URL of the failure source.
    pub url: String,
    /// Full description: URL, status and reason.
    pub message: String,
}

impl From<&UnhealthyBackend> for BackendFailure {
    fn from(value: &UnhealthyBackend) -> Self {
        Self {
            reason: value.reason().to_owned(),
            status: value.status(),
            url: value.url().to_owned(),
            message: value.to_string(),
        }
    }
}

/// Body of `GET /api/health/backend`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BackendHealthResponse {
    /// Last recorded backend status.
    pub status: HealthLabel,
    /// Failure details when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BackendFailure>,
}

impl BackendHealthResponse {
    fn from_status(status: Option<&HealthStatus>) -> Self {
        match status {
            None => Self {
                status: HealthLabel::Unknown,
                error: None,
            },
            Some(HealthStatus::Healthy) => Self {
                status: HealthLabel::Healthy,
                error: None,
            },
            Some(HealthStatus::Unhealthy(details)) => Self {
                status: HealthLabel::Unhealthy,
                error: Some(BackendFailure::from(details)),
            },
        }
    }
}

/// Failures of the health handlers themselves.
#[derive(Debug, thiserror::Error)]
pub enum HealthEndpointError {
    /// No [`HealthMonitor`] is registered as app data.
    #[error("health monitor is not configured")]
    MonitorUnavailable,
}

impl ResponseError for HealthEndpointError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        error!(error = %self, "health endpoint failed");
        no_store(HttpResponse::build(self.status_code())).json(HealthResponse::unhealthy())
    }
}

fn no_store(mut builder: HttpResponseBuilder) -> HttpResponseBuilder {
    builder.insert_header((header::CACHE_CONTROL, NO_STORE));
    builder
}

fn monitor_from(
    monitor: Option<web::Data<HealthMonitor>>,
) -> Result<web::Data<HealthMonitor>, HealthEndpointError> {
    monitor.ok_or(HealthEndpointError::MonitorUnavailable)
}

/// Gateway health. Triggers one backend check, then reports the gateway
/// itself as healthy whatever the backend answered.
#[utoipa::path(
    get,
    path = "/api/health",
    tags = ["health"],
    responses(
        (status = 200, description = "Gateway is serving requests", body = HealthResponse),
        (status = 500, description = "Health handler failed", body = HealthResponse)
    )
)]
#[get("/api/health")]
pub async fn health(
    monitor: Option<web::Data<HealthMonitor>>,
) -> Result<HttpResponse, HealthEndpointError> {
    let monitor = monitor_from(monitor)?;
    match monitor.tick().await {
        TickOutcome::Completed(status) => {
            debug!(healthy = status.is_healthy(), "health check requested via HTTP");
        }
        TickOutcome::AlreadyInFlight => debug!("health check already running"),
    }
    Ok(no_store(HttpResponse::Ok()).json(HealthResponse::healthy()))
}

/// Last recorded backend status. Does not trigger a check.
#[utoipa::path(
    get,
    path = "/api/health/backend",
    tags = ["health"],
    responses(
        (status = 200, description = "Backend answered its last check", body = BackendHealthResponse),
        (
            status = 503,
            description = "Backend failed its last check or has not been checked yet",
            body = BackendHealthResponse
        ),
        (status = 500, description = "Health handler failed", body = HealthResponse)
    )
)]
#[get("/api/health/backend")]
pub async fn backend_health(
    monitor: Option<web::Data<HealthMonitor>>,
) -> Result<HttpResponse, HealthEndpointError> {
    let monitor = monitor_from(monitor)?;
    let status = monitor.status();
    let body = BackendHealthResponse::from_status(status.as_ref());
    let builder = if body.status == HealthLabel::Healthy {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    Ok(no_store(builder).json(body))
}

/// Register both health endpoints.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(backend_health);
}
