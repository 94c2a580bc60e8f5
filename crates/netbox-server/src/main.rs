//! NetBox bridge server.
//!
//! ```bash
//! netbox-server --driver mock --data-dir ./data
//! RUST_LOG=debug netbox-server --config /etc/netbox.toml
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use netbox_server::config::{Cli, ServerConfig};
use netbox_server::state::AppState;
use netbox_server::{drivers, server};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(&cli).context("failed to load configuration")?;
    info!(
        bind = %config.bind,
        data_dir = %config.data_dir.display(),
        "Configuration loaded"
    );

    let bridge = drivers::build_bridge(&config).context("failed to set up device drivers")?;
    let state = AppState::new(bridge, config.request_timeout());

    let (addr, serving) = server::bind(config.bind_addr()?, state.clone(), shutdown_signal())
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(%addr, "NetBox bridge ready");

    serving.await.context("HTTP server failed")?;

    match state.shutdown().await {
        Ok(true) => info!("Active measurement closed"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "Closing the active measurement failed"),
    }
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
