//! Gamma exposure backend for option chain charts
//!
//! # Architecture
//! - **core**: Option types, strikes, quotes and OHLC bars
//! - **analysis**: Black-Scholes gamma and exposure statistics
//! - **tradier**: REST client and on-disk option chain cache
//! - **engine**: Orchestrates fetch, cache and analysis
//! - **infrastructure**: Config, logging, metrics, HTTP API

use anyhow::Context;
use gex_server::infrastructure::api::{start_server, AppState};
use gex_server::infrastructure::logging::init_logging;
use gex_server::infrastructure::metrics::MetricsCollector;
use gex_server::{AppEngine, Config};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Access token usually lives in .env during development
    dotenvy::dotenv().ok();

    let config = Config::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let _guards = init_logging(&config.logging).context("failed to initialize logging")?;

    tracing::info!("Starting gamma exposure backend...");

    let metrics = Arc::new(MetricsCollector::new());
    let engine = AppEngine::from_config(&config, metrics.clone())
        .context("failed to initialize engine")?;

    let state = AppState {
        engine: Arc::new(engine),
        metrics,
    };

    start_server(state, &config.api).await?;

    Ok(())
}
