//! PersonHub HTTP server entry point.

mod config;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::{Args, ServerConfig};
use log::info;
use personhub_api::{app, AppState};
use personhub_core::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from(Args::parse());
    let cwd = std::env::current_dir().context("resolve working directory")?;
    init_logging(&config.logging(&cwd)).map_err(|err| anyhow!("logging init failed: {err}"))?;

    let state = match &config.db_path {
        Some(path) => AppState::open(path)
            .with_context(|| format!("open database {}", path.display()))?,
        None => AppState::in_memory().context("open in-memory database")?,
    };

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(
        "event=server_start module=server status=ok addr={addr} storage={}",
        if config.db_path.is_some() { "file" } else { "memory" }
    );

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
