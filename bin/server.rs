// Front Desk - Web Server

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use front_desk::config::DEFAULT_CONFIG_FILE;
use front_desk::web::{router, AppState};
use front_desk::{logging, AppConfig, RegistryService};

#[derive(Parser)]
#[command(name = "front-desk-server")]
#[command(about = "Front-desk registration web server", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load_from(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Err(msg) = config.validate() {
        bail!("Invalid configuration: {msg}");
    }
    logging::init(&config.log_level);

    // Import + load. A bad record file stops us here.
    let registry = RegistryService::bootstrap(&config).context("Cannot start without records")?;

    let state = AppState::new(registry, &config);
    let app = router(state, &config);

    let addr = config.bind_address();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            bail!("{addr} requires elevated privileges")
        }
        Err(e) if e.kind() == ErrorKind::AddrInUse => bail!("{addr} is already in use"),
        Err(e) => return Err(e).with_context(|| format!("Failed to bind {addr}")),
    };

    info!("Listening on: {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server closed.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down server...");
}
