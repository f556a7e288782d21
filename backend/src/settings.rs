//! Gateway configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `POCKETGATE_*` environment variables and
//! configuration files. Accessors validate and apply defaults so callers
//! never see a half-parsed value.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::domain::{DEFAULT_CHECK_TIMEOUT, DEFAULT_POLL_INTERVAL};

/// PocketBase URL used when none is configured.
pub const DEFAULT_PB_URL: &str = "http://127.0.0.1:8090";
/// Listener address used when none is configured.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
/// Auth collection used when none is configured.
pub const DEFAULT_USERS_COLLECTION: &str = "users";

/// Errors raised while validating settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// `pb_url` is not an absolute URL.
    #[error("invalid PocketBase URL {value:?}: {source}")]
    InvalidPbUrl {
        /// Rejected value.
        value: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },
    /// `bind_addr` is not a socket address.
    #[error("invalid bind address {value:?}: {source}")]
    InvalidBindAddr {
        /// Rejected value.
        value: String,
        /// Parse failure.
        #[source]
        source: std::net::AddrParseError,
    },
    /// A duration setting was zero.
    #[error("{field} must be greater than zero")]
    ZeroDuration {
        /// Setting name.
        field: &'static str,
    },
}

/// Gateway settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "POCKETGATE")]
pub struct GatewaySettings {
    /// Base URL of the PocketBase instance.
    pub pb_url: Option<String>,
    /// Address the HTTP server listens on.
    pub bind_addr: Option<String>,
    /// Delay between scheduled health checks, in milliseconds.
    pub health_interval_ms: Option<u64>,
    /// Bound on a single health check, in milliseconds.
    pub health_timeout_ms: Option<u64>,
    /// Log every health check, not only transitions.
    #[ortho_config(default = false)]
    pub health_verbose: bool,
    /// Auth collection holding user accounts.
    pub users_collection: Option<String>,
}

impl GatewaySettings {
    /// Parse the PocketBase URL, warning when the default is used.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidPbUrl`] when the value does not parse.
    pub fn pb_url(&self) -> Result<Url, SettingsError> {
        let value = match self.pb_url.as_deref() {
            Some(value) => value,
            None => {
                warn!(default = DEFAULT_PB_URL, "POCKETGATE_PB_URL is not set; using default");
                DEFAULT_PB_URL
            }
        };
        Url::parse(value).map_err(|source| SettingsError::InvalidPbUrl {
            value: value.to_owned(),
            source,
        })
    }

    /// Parse the listener address.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidBindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|source| SettingsError::InvalidBindAddr {
                value: value.to_owned(),
                source,
            })
    }

    /// Delay between scheduled health checks.
    ///
    /// # Errors
    /// Returns [`SettingsError::ZeroDuration`] for a zero interval.
    pub fn health_interval(&self) -> Result<Duration, SettingsError> {
        non_zero(
            "health_interval_ms",
            self.health_interval_ms,
            DEFAULT_POLL_INTERVAL,
        )
    }

    /// Bound on a single health check.
    ///
    /// # Errors
    /// Returns [`SettingsError::ZeroDuration`] for a zero timeout.
    pub fn health_timeout(&self) -> Result<Duration, SettingsError> {
        non_zero(
            "health_timeout_ms",
            self.health_timeout_ms,
            DEFAULT_CHECK_TIMEOUT,
        )
    }

    /// Auth collection name.
    pub fn users_collection(&self) -> &str {
        self.users_collection
            .as_deref()
            .unwrap_or(DEFAULT_USERS_COLLECTION)
    }
}

fn non_zero(
    field: &'static str,
    millis: Option<u64>,
    default: Duration,
) -> Result<Duration, SettingsError> {
    match millis {
        None => Ok(default),
        Some(0) => Err(SettingsError::ZeroDuration { field }),
        Some(millis) => Ok(Duration::from_millis(millis)),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for gateway settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 6] = [
        "POCKETGATE_PB_URL",
        "POCKETGATE_BIND_ADDR",
        "POCKETGATE_HEALTH_INTERVAL_MS",
        "POCKETGATE_HEALTH_TIMEOUT_MS",
        "POCKETGATE_HEALTH_VERBOSE",
        "POCKETGATE_USERS_COLLECTION",
    ];

    fn load_from_empty_args() -> GatewaySettings {
        GatewaySettings::load_from_iter([OsString::from("pocketgate")])
            .expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();

        assert_eq!(
            settings.pb_url().expect("default url").as_str(),
            "http://127.0.0.1:8090/"
        );
        assert_eq!(
            settings.bind_addr().expect("default addr"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(
            settings.health_interval().expect("interval"),
            Duration::from_millis(15_000)
        );
        assert_eq!(
            settings.health_timeout().expect("timeout"),
            Duration::from_millis(4_000)
        );
        assert!(!settings.health_verbose);
        assert_eq!(settings.users_collection(), "users");
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let values = [
            Some("https://pb.example.com".to_owned()),
            Some("127.0.0.1:9000".to_owned()),
            Some("5000".to_owned()),
            Some("750".to_owned()),
            Some("true".to_owned()),
            Some("members".to_owned()),
        ];
        let _guard = lock_env(VARS.into_iter().zip(values));

        let settings = load_from_empty_args();

        assert_eq!(
            settings.pb_url().expect("url").host_str(),
            Some("pb.example.com")
        );
        assert_eq!(settings.bind_addr().expect("addr").port(), 9000);
        assert_eq!(
            settings.health_interval().expect("interval"),
            Duration::from_millis(5_000)
        );
        assert_eq!(
            settings.health_timeout().expect("timeout"),
            Duration::from_millis(750)
        );
        assert!(settings.health_verbose);
        assert_eq!(settings.users_collection(), "members");
    }

    #[rstest]
    fn invalid_values_are_reported() {
        let settings = GatewaySettings {
            pb_url: Some("not a url".to_owned()),
            bind_addr: Some("nowhere".to_owned()),
            health_interval_ms: Some(0),
            health_timeout_ms: None,
            health_verbose: false,
            users_collection: None,
        };

        assert!(matches!(
            settings.pb_url(),
            Err(SettingsError::InvalidPbUrl { .. })
        ));
        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::InvalidBindAddr { .. })
        ));
        assert!(matches!(
            settings.health_interval(),
            Err(SettingsError::ZeroDuration {
                field: "health_interval_ms"
            })
        ));
    }
}
