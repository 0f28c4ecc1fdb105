//! Core Application Engine
//!
//! Orchestrates the Tradier client, the chain cache and the analysis code.
//! Everything the HTTP API serves goes through here.

use std::sync::Arc;
use time::OffsetDateTime;

use crate::analysis::gamma_exposure::{
    gamma_exposure_aggregate, gamma_exposure_by_price, gamma_exposure_spot_profile,
    GammaExposureOptions, GammaExposureStats,
};
use crate::core::{Ohlc, OhlcInterval, Quote};
use crate::infrastructure::config::{AnalysisConfig, Config};
use crate::infrastructure::metrics::MetricsCollector;
use crate::tradier::{normalize_symbol, ChainCache, TradierClient};
use crate::{GexError, Result};

/// Main engine serving market data and gamma exposure
pub struct AppEngine {
    tradier: TradierClient,
    analysis: AnalysisConfig,
    metrics: Arc<MetricsCollector>,
}

impl AppEngine {
    /// Create engine from pre-built parts
    pub fn new(
        tradier: TradierClient,
        analysis: AnalysisConfig,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            tradier,
            analysis,
            metrics,
        }
    }

    /// Build cache and client from configuration
    ///
    /// Fails if the Tradier token is missing or the cache directory cannot
    /// be created.
    pub fn from_config(config: &Config, metrics: Arc<MetricsCollector>) -> Result<Self> {
        let cache = ChainCache::new(config.cache.clone())?;
        if cache.is_enabled() {
            tracing::info!("Option chain cache at {}", config.cache.dir.display());
        }

        let tradier = TradierClient::new(&config.tradier, cache, metrics.clone())?;
        tracing::info!("Using Tradier API at {}", config.tradier.base_url);

        Ok(Self::new(tradier, config.analysis.clone(), metrics))
    }

    /// Get metrics collector reference
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Latest quote
    pub async fn quote(&self, symbol: &str) -> Result<Quote> {
        self.tradier.get_quote(symbol).await
    }

    /// Recent OHLC bars at `interval`
    pub async fn ohlc(&self, symbol: &str, interval: OhlcInterval) -> Result<Vec<Ohlc>> {
        let bars = self
            .tradier
            .get_time_and_sales(symbol, interval, OffsetDateTime::now_utc())
            .await?;

        Ok(bars.into_iter().map(|ts| (interval, ts).into()).collect())
    }

    /// Gamma exposure statistics for the symbol's full option chain
    pub async fn gamma_exposure(
        &self,
        symbol: &str,
        options: GammaExposureOptions,
    ) -> Result<GammaExposureStats> {
        let symbol = normalize_symbol(symbol)?;
        let chain = self
            .tradier
            .get_option_chain(&symbol, options.force_download)
            .await?;

        if chain.is_empty() {
            return Err(GexError::NotFound(format!("no option chain for {}", symbol)));
        }

        let exposures = if options.aggregate {
            // CPU bound, keep it off the async workers
            let today = OffsetDateTime::now_utc().date();
            let analysis = self.analysis.clone();
            let spot_profile = options.spot_profile;
            tokio::task::spawn_blocking(move || {
                if spot_profile {
                    gamma_exposure_spot_profile(&chain, today, &analysis)
                } else {
                    gamma_exposure_aggregate(&chain, today, &analysis)
                }
            })
            .await
            .map_err(|e| GexError::Analysis(format!("aggregate task failed: {}", e)))??
        } else {
            gamma_exposure_by_price(&chain, self.analysis.max_abs_gamma)
        };

        tracing::info!(
            "Computed {} gamma exposure for {} over {} prices",
            match (options.aggregate, options.spot_profile) {
                (true, true) => "spot profile",
                (true, false) => "aggregate",
                (false, _) => "per-strike",
            },
            symbol,
            exposures.len()
        );

        Ok(GammaExposureStats::new(&exposures))
    }
}
