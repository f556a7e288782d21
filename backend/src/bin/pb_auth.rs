//! Drive the authentication gateway and health monitor from the command line.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, eyre};
use pocketgate::domain::ports::{FixturePocketBase, PocketBaseApi};
use pocketgate::domain::{
    AuthError, AuthGateway, AuthStateObserver, BackendHandle, HealthMonitor, HealthStatus,
    TickOutcome,
};
use pocketgate::outbound::pocketbase::{PocketBaseHttpClient, PocketBaseHttpConfig};
use ortho_config::OrthoConfig;
use pocketgate::settings::GatewaySettings;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `pb-auth` command arguments.
#[derive(Debug, Parser)]
#[command(
    name = "pb-auth",
    about = "Sign in, sign up or check health against a PocketBase backend",
    version
)]
struct CliArgs {
    /// Use an in-memory backend instead of `POCKETGATE_PB_URL`.
    #[arg(long)]
    fixture: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
enum Command {
    /// Authenticate with email and password.
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in with it.
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Defaults to `--password`.
        #[arg(long = "password-confirm")]
        password_confirm: Option<String>,
    },
    /// Run one backend health check.
    Health,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to build pb-auth runtime")?;
    runtime.block_on(run(args))
}

/// Install the stderr subscriber, warning when one is already installed.
fn init_tracing() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}

async fn run(args: CliArgs) -> Result<()> {
    let backend = BackendHandle::new(connect(args.fixture)?);
    match args.command {
        Command::SignIn { email, password } => {
            let gateway = AuthGateway::new(backend);
            let observer = AuthStateObserver::new(gateway.backend().auth());
            let outcome = gateway.sign_in(&email, &password).await;
            report_auth(outcome, &observer)
        }
        Command::SignUp {
            email,
            password,
            password_confirm,
        } => {
            let gateway = AuthGateway::new(backend);
            let observer = AuthStateObserver::new(gateway.backend().auth());
            let confirm = password_confirm.unwrap_or_else(|| password.clone());
            let outcome = gateway.sign_up(&email, &password, &confirm).await;
            report_auth(outcome, &observer)
        }
        Command::Health => {
            let monitor = HealthMonitor::new(&backend);
            match monitor.tick().await {
                TickOutcome::Completed(HealthStatus::Healthy) => {
                    println!("status=HEALTHY");
                    println!("url={}", backend.base_url());
                    Ok(())
                }
                TickOutcome::Completed(HealthStatus::Unhealthy(details)) => {
                    println!("status=UNHEALTHY");
                    println!("http_status={}", details.status());
                    println!("message={details}");
                    Err(eyre!("backend is unhealthy"))
                }
                TickOutcome::AlreadyInFlight => Err(eyre!("health check already running")),
            }
        }
    }
}

fn connect(fixture: bool) -> Result<Arc<dyn PocketBaseApi>> {
    if fixture {
        return Ok(Arc::new(FixturePocketBase::default()));
    }
    let settings = GatewaySettings::load_from_iter([OsString::from("pb-auth")])
        .map_err(|error| eyre!("failed to load settings: {error}"))?;
    let client = PocketBaseHttpClient::with_config(
        settings.pb_url()?,
        PocketBaseHttpConfig {
            users_collection: settings.users_collection().to_owned(),
            health_timeout: settings.health_timeout()?,
            ..PocketBaseHttpConfig::default()
        },
    )
    .wrap_err("failed to build PocketBase client")?;
    Ok(Arc::new(client))
}

fn report_auth(
    outcome: std::result::Result<pocketgate::domain::UserRecord, AuthError>,
    observer: &AuthStateObserver,
) -> Result<()> {
    match outcome {
        Ok(record) => {
            println!("authenticated={}", observer.is_authenticated());
            println!("id={}", record.id);
            println!("email={}", record.email);
            Ok(())
        }
        Err(error) => {
            println!("authenticated={}", observer.is_authenticated());
            println!("code={}", error.code());
            println!("message={}", error.message());
            Err(eyre!("authentication failed: {}", error.code()))
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for argument parsing.

    use clap::Parser;
    use rstest::rstest;

    use super::{CliArgs, Command, init_tracing};

    #[rstest]
    fn sign_up_confirmation_is_optional() {
        let args = CliArgs::try_parse_from([
            "pb-auth",
            "sign-up",
            "--email",
            "a@example.com",
            "--password",
            "password123",
        ])
        .expect("args parse");

        assert!(!args.fixture);
        assert_eq!(
            args.command,
            Command::SignUp {
                email: "a@example.com".to_owned(),
                password: "password123".to_owned(),
                password_confirm: None,
            }
        );
    }

    #[rstest]
    fn fixture_flag_precedes_the_subcommand() {
        let args = CliArgs::try_parse_from(["pb-auth", "--fixture", "health"]).expect("args parse");

        assert!(args.fixture);
        assert_eq!(args.command, Command::Health);
    }

    #[rstest]
    fn tracing_init_tolerates_an_installed_subscriber() {
        init_tracing();
        init_tracing();
        tracing::warn!("still logging after a repeated init");
    }

    #[rstest]
    #[case(&["pb-auth"])]
    #[case(&["pb-auth", "sign-in", "--email", "a@example.com"])]
    fn incomplete_invocations_are_rejected(#[case] argv: &[&str]) {
        assert!(CliArgs::try_parse_from(argv).is_err());
    }
}
