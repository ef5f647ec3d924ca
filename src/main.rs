use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use rss_relay::api::{self, AppState};
use rss_relay::config::{Config, ConfigError};
use rss_relay::feed::{Aggregator, HttpFeedParser};
use rss_relay::service::FeedService;

#[derive(Parser, Debug)]
#[command(name = "rss-relay", about = "Fetch, normalize and aggregate RSS/Atom feeds over HTTP")]
struct Args {
    /// Path to the TOML config file (optional)
    #[arg(long, value_name = "FILE", default_value = "rss-relay.toml")]
    config: PathBuf,

    /// Listen address, overrides `listen_addr` from the config file
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
        config.validate().context("Invalid --listen address")?;
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log_level directive")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!(config = ?config, "Starting rss-relay");

    let client = HttpFeedParser::default_client().context("Failed to build HTTP client")?;
    let parser = Arc::new(
        HttpFeedParser::new(client)
            .with_fetch_timeout(config.fetch_timeout())
            .with_max_feed_size(config.max_feed_bytes),
    );

    let aggregator = Aggregator::new(parser.clone()).abort_stragglers(config.abort_stragglers);
    let service = FeedService::new(parser).with_aggregator(aggregator);
    let state = AppState::new(service).with_default_timeout(config.request_timeout());

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to listen on {}", addr))?;

    api::serve(listener, api::create_router(state))
        .await
        .context("failed to serve")?;

    Ok(())
}

/// Loads the config under a temporary subscriber, so its warnings are visible
/// before the configured `log_level` can be applied.
fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let bootstrap = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::with_default(bootstrap, || Config::load(path))
}
