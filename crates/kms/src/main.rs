//! `kms` — key management service entry point.
//!
//! Startup sequence:
//! 1. Parse flags and load the validated [`Config`] from the environment.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP export).
//! 3. Load the master key from the configured source into a [`KeyManager`].
//! 4. Build the Axum router and bind the listener.
//! 5. Serve until a termination signal, then drain within the grace period.
//!
//! Any failure before step 5 is fatal and exits non-zero.

mod config;
mod crypto;
mod keys;
mod server;
mod telemetry;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use config::{Cli, Config};
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cli = Cli::parse();
    let cfg = Config::load(&cli).map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), cfg.log_directive()?)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        key_source = ?cfg.key_source,
        "kms starting"
    );

    let result = run(&cfg).await;
    if let Err(e) = &result {
        error!(error = ?e, "kms exiting with error");
    }
    telemetry::shutdown_telemetry();
    result
}

async fn run(cfg: &Config) -> Result<()> {
    // -----------------------------------------------------------------------
    // 3. Master key
    // -----------------------------------------------------------------------
    let key_manager = keys::load_key_manager(cfg).await?;
    info!(key_fingerprint = key_manager.fingerprint(), "master key loaded");

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(key_manager, cfg.distinguish_decrypt_errors);
    let router = server::router::build(state, cfg.cors_origin_header()?, cfg.max_body_bytes);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, cors_origin = %cfg.cors_origin, "listening");

    // -----------------------------------------------------------------------
    // 5. Serve until signalled
    // -----------------------------------------------------------------------
    let shutdown = CancellationToken::new();
    let signals = server::shutdown::spawn_signal_listener(shutdown.clone());
    server::shutdown::serve_until_signalled(
        listener,
        router,
        shutdown,
        signals,
        Duration::from_secs(cfg.shutdown_grace_secs),
    )
    .await
}
