//! Gateway entry-point: wires the PocketBase client, health polling and the
//! HTTP health surface.

mod server;

use std::io;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use pocketgate::domain::{BackendHandle, HealthMonitor};
use pocketgate::outbound::pocketbase::{PocketBaseHttpClient, PocketBaseHttpConfig};
use ortho_config::OrthoConfig;
use pocketgate::settings::GatewaySettings;
use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = GatewaySettings::load_from_iter(std::env::args_os())
        .map_err(|e| io::Error::other(format!("failed to load settings: {e}")))?;
    let pb_url = settings.pb_url().map_err(io::Error::other)?;
    let bind_addr = settings.bind_addr().map_err(io::Error::other)?;
    let interval = settings.health_interval().map_err(io::Error::other)?;
    let timeout = settings.health_timeout().map_err(io::Error::other)?;

    let client = PocketBaseHttpClient::with_config(
        pb_url.clone(),
        PocketBaseHttpConfig {
            users_collection: settings.users_collection().to_owned(),
            health_timeout: timeout,
            ..PocketBaseHttpConfig::default()
        },
    )
    .map_err(|e| io::Error::other(format!("failed to build PocketBase client: {e}")))?;
    let backend = BackendHandle::new(Arc::new(client));
    info!(pb_url = %pb_url, "PocketBase client ready");

    let monitor = HealthMonitor::with_timeout(&backend, timeout);
    monitor.start_polling(interval, settings.health_verbose);

    let server = create_server(ServerConfig::new(bind_addr, monitor.clone()))?;
    let result = server.await;
    monitor.stop_polling();
    result
}
