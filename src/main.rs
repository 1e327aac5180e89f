mod config;
mod handlers;
mod platform;
mod providers;
mod router;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handlers::Services;
use crate::providers::{OpenWeatherClient, YoutubeSearchClient, YtDlpExtractor};
use crate::router::Router;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relaybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Secrets may live in a .env file next to the binary
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Weather city: {}", config.weather.city);
    info!("  Video search API: {}", config.youtube.base_url);
    info!("  Extractor: {}", config.extractor.program);

    let services = Services {
        weather: Arc::new(OpenWeatherClient::new(
            config.weather.api_key.clone(),
            config.weather.base_url.clone(),
        )),
        search: Arc::new(YoutubeSearchClient::new(
            config.youtube.api_key.clone(),
            config.youtube.base_url.clone(),
        )),
        extractor: Arc::new(YtDlpExtractor::new(config.extractor.program.clone())),
        city: config.weather.city.clone(),
    };

    let bot = teloxide::Bot::new(&config.telegram.bot_token);
    let username = platform::telegram::bot_username(&bot).await;
    if let Some(name) = &username {
        info!("  Bot username: @{}", name);
    }

    let router = Arc::new(Router::new(services).with_bot_username(username));

    info!("Bot is starting...");
    platform::telegram::run(router, bot).await?;

    Ok(())
}
