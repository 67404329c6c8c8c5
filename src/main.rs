mod bot;
mod config;
mod extractor;
mod handlers;
mod platform;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::{Config, RuntimeMode};
use crate::extractor::YtDlp;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lightning=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Runtime mode: {}", config.runtime.mode);
    info!("  Downloader: {}", config.downloader.binary);
    info!("  Allowed users: {:?}", config.telegram.allowed_user_ids);

    let extractor = YtDlp::new(&config.downloader);
    match extractor.version() {
        Ok(version) => info!("  {} version: {}", config.downloader.binary, version),
        Err(e) => warn!("Downloader not usable yet, /play will fail: {:#}", e),
    }

    let runtime = match config.runtime.mode {
        RuntimeMode::Threaded => tokio::runtime::Builder::new_multi_thread(),
        RuntimeMode::Cooperative => tokio::runtime::Builder::new_current_thread(),
    }
    .enable_all()
    .build()
    .context("Failed to build async runtime")?;

    let state = Arc::new(AppState::new(config, Arc::new(extractor)));

    info!("Bot is starting...");
    runtime.block_on(bot::run(state))?;

    info!("Bot stopped");
    Ok(())
}
