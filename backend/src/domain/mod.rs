//! Domain primitives and services.
//!
//! Purpose: Define the gateway's authentication and health semantics
//! independently of HTTP or the PocketBase wire format. Services reach the
//! backend only through the [`ports::PocketBaseApi`] driven port, carried by
//! the shared [`BackendHandle`].
//!
//! Public surface:
//! - AuthError / AuthErrorCode — closed sign-up and sign-in error taxonomy.
//! - AuthGateway — sign-in, sign-up, logout, refresh and auth subscription.
//! - AuthStateObserver — read-only projection of the signed-in user.
//! - HealthMonitor — scheduled backend health checks.
//! - Observable / Subscription — change-notifying value cell.

pub mod auth;
pub mod auth_error;
pub mod auth_gateway;
pub mod auth_state;
pub mod auth_store;
pub mod backend;
pub mod health;
pub mod health_monitor;
pub mod observable;
pub mod ports;
pub mod user;

pub use self::auth::{Credentials, MIN_PASSWORD_LENGTH, SignUpCredentials, normalize_email};
pub use self::auth_error::{
    AuthError, AuthErrorCode, FieldError, FieldErrors, RawFailure, SignInFailureKind,
    classify_sign_in_error, classify_sign_up_error, extract_message,
};
pub use self::auth_gateway::AuthGateway;
pub use self::auth_state::{AuthSnapshot, AuthStateObserver};
pub use self::auth_store::AuthStore;
pub use self::backend::BackendHandle;
pub use self::health::{HealthStatus, UnhealthyBackend};
pub use self::health_monitor::{
    DEFAULT_CHECK_TIMEOUT, DEFAULT_POLL_INTERVAL, HealthMonitor, TickOutcome,
};
pub use self::observable::{Observable, Subscription};
pub use self::user::{AuthSession, UserRecord};
