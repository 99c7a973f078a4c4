//! keyprobe
//!
//! Single-binary service that:
//! 1. Accepts arbitrary text on POST /data
//! 2. Extracts provider API credentials from it
//! 3. Verifies and tier-classifies each one against its provider
//! 4. Serves the live keys back, grouped by provider and tier

mod api;
mod config;
mod error;
mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use key_pool::{Registry, Sweep, TokioScheduler, spawn_sweep_task};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs, LOG_LEVEL then RUST_LOG then info
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting keyprobe");

    // Must precede anything that records metrics
    let prometheus_handle =
        metrics::install_recorder().context("failed to install Prometheus recorder")?;

    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        storage_dir = %config.storage.dir.display(),
        providers = ?config.providers.enabled,
        timeout_secs = config.verification.timeout_secs,
        "configuration loaded"
    );

    let client = provider::http::client(config.verification.timeout())
        .context("failed to build HTTP client")?;

    let enabled = config
        .providers
        .enabled
        .iter()
        .filter_map(|name| adapters::by_name(name, &client))
        .collect();

    let registry = Arc::new(
        Registry::load(
            enabled,
            &config.storage.dir,
            Arc::new(TokioScheduler),
            config.verification.retry_delay(),
        )
        .await,
    );

    let full_sweep = spawn_sweep_task(
        registry.clone(),
        Sweep::Full,
        config.verification.refresh_interval(),
    );
    let quota_sweep = spawn_sweep_task(
        registry.clone(),
        Sweep::QuotaExhausted,
        config.verification.quota_refresh_interval(),
    );

    let app = api::build_router(
        AppState::new(registry, prometheus_handle),
        config.server.max_connections,
    );

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        warn!(error = %e, "server error during shutdown");
    }

    // Background sweeps and pending retries do not outlive the process
    full_sweep.abort();
    quota_sweep.abort();

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
