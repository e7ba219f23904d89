//! vsi-aggregator - Vehicle Safety Intelligence service
//!
//! Serves normalized, severity-ranked recall and complaint data for a
//! vehicle over HTTP, caching results for the configured TTL.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use vsi_aggregator::identity::IdentityResolver;
use vsi_aggregator::{AppState, SafetyAggregator};
use vsi_common::config::{self, CONFIG_PATH_ENV};
use vsi_common::{Clock, SystemClock};

#[derive(Debug, Parser)]
#[command(name = "vsi-aggregator", version, about = "Vehicle safety intelligence aggregator")]
struct Cli {
    /// Path to TOML config file
    #[arg(long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Listen address (overrides config and VSI_BIND_ADDRESS)
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Step 1: Resolve and load configuration [CLI → ENV → platform dir → defaults]
    let config_path = config::resolve_config_path(cli.config.as_deref(), CONFIG_PATH_ENV);
    let mut config = config::load_config(config_path.as_deref())?;
    config.apply_env_overrides();
    if let Some(bind) = cli.bind {
        config.bind_address = bind;
    }

    // Step 2: Initialize tracing (RUST_LOG wins over configured level)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;
    fmt().with_env_filter(filter).init();

    info!("Starting vsi-aggregator (Vehicle Safety Intelligence)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: compiled defaults"),
    }

    // Step 3: Build aggregator (feed clients, classifier, cache)
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let aggregator = Arc::new(SafetyAggregator::from_config(&config, Arc::clone(&clock))?);
    info!(
        recall_feed = %config.feeds.recall_base_url,
        complaint_feed = %config.feeds.complaint_base_url,
        timeout_secs = config.feeds.timeout_secs,
        ttl_hours = config.cache.ttl_hours,
        single_flight = config.cache.single_flight,
        "Safety aggregator initialized"
    );

    let shutdown = CancellationToken::new();

    // Step 4: Optional cache sweep (lazy expiry works without it)
    if config.cache.sweep_interval_secs > 0 {
        Arc::clone(aggregator.cache()).spawn_sweeper(
            std::time::Duration::from_secs(config.cache.sweep_interval_secs),
            shutdown.clone(),
        );
    }

    // Step 5: Serve
    let state = AppState::new(aggregator, IdentityResolver::new(clock), shutdown.clone());
    let app = vsi_aggregator::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested; cancelling in-flight lookups");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
