//! CraftDeploy service entry point.

mod api;
mod config;
mod error;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::ServiceConfig;
use crate::state::AppState;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "starting CraftDeploy service"
    );

    let config = ServiceConfig::load()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))?;

    tracing::info!("service shut down cleanly");
    Ok(())
}

async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));

    tracing::info!(
        resolver = %config.resolver.command,
        mods_directory = %config.mods_directory,
        "resolver configured"
    );
    let state = Arc::new(AppState::new(config)?);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP API listening");

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            return;
        }
        tracing::info!("shutdown requested");
        signal_cancel.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}
