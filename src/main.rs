//! Capture daemon: bind the configured deception ports and record all
//! inbound traffic until interrupted.

use anyhow::Result;
use tracing::{info, Level};

use portsnare::{config, handlers, store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before any other initialization)
    let _ = dotenvy::dotenv();

    let config = config::Config::load()?;

    let level: Level = config
        .logging
        .level
        .parse()
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Starting capture engine...");

    let store = store::RecordStore::open(&config.capture.log_dir).await?;
    info!("Recording to {}", store.path().display());

    handlers::start_all(&config, store).await?;

    // Listeners are detached tasks; the process stays alive until
    // interrupted. Every append is already complete when we exit.
    tokio::signal::ctrl_c().await?;
    info!("Shutting down capture engine");

    Ok(())
}
