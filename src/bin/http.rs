use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use wbs_timeline::{SqliteStore, WbsConfig, http_api};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env("WBS_TIMELINE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    let config = WbsConfig::load()?;
    let addr: SocketAddr = config
        .http_addr
        .parse()
        .with_context(|| format!("invalid http_addr '{}'", config.http_addr))?;

    if let Some(dir) = config.database_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let store = SqliteStore::new(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    tracing::info!(%addr, db = %config.database_path.display(), "wbs-timeline HTTP API listening");
    http_api::serve(addr, http_api::AppState::new(store, config.unit_width)).await?;
    Ok(())
}
