//! HTTP server configuration object.

use std::net::SocketAddr;

use pocketgate::domain::HealthMonitor;

/// Configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) monitor: HealthMonitor,
}

impl ServerConfig {
    /// Construct a server configuration serving `monitor` on `bind_addr`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, monitor: HealthMonitor) -> Self {
        Self { bind_addr, monitor }
    }
}
