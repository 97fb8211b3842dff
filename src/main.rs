//! staticd: serve a directory tree over HTTP or HTTPS.
//!
//! The binary is a thin operator console around the library's lifecycle
//! controller: parameters come from an optional TOML file and command-line
//! flags, the server is started, and a supervisor loop waits for a shutdown
//! signal or a fatal listener fault.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use staticd::config::{self, DEFAULT_LOG_FILTER};
use staticd::lifecycle::{HttpServer, ServerControl};
use staticd::params::ParamStore;

/// Serve a directory tree over HTTP or HTTPS.
#[derive(Parser, Debug)]
#[command(name = "staticd", version, about)]
struct Args {
    /// Directory tree to serve
    #[arg(short, long)]
    root: Option<String>,

    /// Address to bind to
    #[arg(short, long)]
    address: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    port: Option<u16>,

    /// TLS certificate file; together with --key enables HTTPS, generated when missing
    #[arg(long)]
    certificate: Option<String>,

    /// TLS private key file
    #[arg(long)]
    key: Option<String>,

    /// Parameter file: a TOML table of quoted parameter names to values
    #[arg(short, long)]
    config: Option<String>,

    /// Log level filter (e.g., "staticd=debug")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let log_filter = args
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let params = Arc::new(ParamStore::new());
    let (server, mut faults) = HttpServer::new(Arc::clone(&params));

    if let Some(path) = &args.config {
        config::load_params_file(&params, Path::new(path))?;
    }
    if let Some(root) = args.root {
        params.set(config::PARAM_PATH, root)?;
    }
    if let Some(address) = args.address {
        params.set(config::PARAM_ADDRESS, address)?;
    }
    if let Some(port) = args.port {
        params.set(config::PARAM_PORT, port.to_string())?;
    }
    if let Some(certificate) = args.certificate {
        params.set(config::PARAM_CERTIFICATE, certificate)?;
    }
    if let Some(key) = args.key {
        params.set(config::PARAM_KEY, key)?;
    }

    for (name, value, description) in params.snapshot() {
        tracing::debug!(%name, %value, %description, "parameter");
    }

    server.start()?;
    if let Some(addr) = server.bound_addr().await {
        tracing::info!(%addr, "serving");
    }

    tokio::select! {
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
            server.stop().await?;
        }
        fault = faults.recv() => {
            if let Some(err) = fault {
                return Err(err.into());
            }
        }
    }

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
