//! Tradier REST client
//!
//! API: <https://api.tradier.com/v1> (sandbox: <https://sandbox.tradier.com/v1>)
//! Auth: `Authorization: Bearer <token>`, `Accept: application/json`

use futures_util::future::try_join_all;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::macros::format_description;
use time::{OffsetDateTime, Weekday};
use tokio::sync::Semaphore;
use tracing::Level;

use crate::core::{OhlcInterval, Quote};
use crate::infrastructure::config::TradierConfig;
use crate::infrastructure::metrics::MetricsCollector;
use crate::tradier::cache::ChainCache;
use crate::tradier::models::{
    flatten, ChainResponse, ExpirationsResponse, OptionContract, QuotesResponse, TimeAndSales,
    TimeAndSalesResponse,
};
use crate::tradier::normalize_symbol;
use crate::{log_tradier, GexError, Result};

/// Tradier timestamps are US/Eastern; a fixed offset is close enough for
/// picking the lookback window
const EASTERN_OFFSET_HOURS: i64 = 4;

/// Tradier API client
pub struct TradierClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    max_concurrent_requests: usize,
    cache: ChainCache,
    metrics: Arc<MetricsCollector>,
}

impl TradierClient {
    /// Create client reading the token from the configured environment variable
    pub fn new(
        config: &TradierConfig,
        cache: ChainCache,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        let access_token = std::env::var(&config.access_token_env)
            .map_err(|_| GexError::Config(format!("{} is not set", config.access_token_env)))?;
        Self::with_token(config, access_token, cache, metrics)
    }

    /// Create client with an explicit token
    pub fn with_token(
        config: &TradierConfig,
        access_token: impl Into<String>,
        cache: ChainCache,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("gex-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GexError::Tradier(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            max_concurrent_requests: config.max_concurrent_requests.max(1),
            cache,
            metrics,
        })
    }

    /// GET `path` and decode the JSON body
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();

        log_tradier!(Level::DEBUG, "GET {} {:?}", url, query);
        self.metrics.record_upstream_request();

        let response = self
            .client
            .get(&url)
            .query(query)
            .header(ACCEPT, "application/json")
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                self.metrics.record_upstream_failure();
                GexError::Tradier(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            self.metrics.record_upstream_failure();
            GexError::Tradier(e.to_string())
        })?;
        self.metrics.record_upstream_latency(started.elapsed());

        if !status.is_success() {
            self.metrics.record_upstream_failure();
            log_tradier!(Level::WARN, "{} returned {}: {}", path, status, body);
            return Err(GexError::Http(status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| {
            self.metrics.record_upstream_failure();
            log_tradier!(Level::ERROR, "Failed to decode {}: {}", path, e);
            log_tradier!(Level::ERROR, "{}", body);
            GexError::Parse(e.to_string())
        })
    }

    /// Latest quote for a symbol
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote> {
        let symbol = normalize_symbol(symbol)?;
        let response: QuotesResponse = self
            .get_json("/markets/quotes", &[("symbols", symbol.as_str())])
            .await?;

        flatten(response.quotes.quote)
            .into_iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(&symbol))
            .map(Quote::from)
            .ok_or_else(|| GexError::NotFound(format!("no quote for {}", symbol)))
    }

    /// Intraday bars covering the last few sessions
    pub async fn get_time_and_sales(
        &self,
        symbol: &str,
        interval: OhlcInterval,
        now: OffsetDateTime,
    ) -> Result<Vec<TimeAndSales>> {
        let symbol = normalize_symbol(symbol)?;
        let start = timesales_start(now)?;
        let interval = interval.to_string();

        let response: TimeAndSalesResponse = self
            .get_json(
                "/markets/timesales",
                &[
                    ("symbol", symbol.as_str()),
                    ("interval", interval.as_str()),
                    ("start", start.as_str()),
                ],
            )
            .await?;

        Ok(response.series.map(|s| flatten(s.data)).unwrap_or_default())
    }

    /// Option expiration dates (`YYYY-MM-DD`), ascending
    pub async fn get_expirations(&self, symbol: &str) -> Result<Vec<String>> {
        let response: ExpirationsResponse = self
            .get_json("/markets/options/expirations", &[("symbol", symbol)])
            .await?;

        Ok(response.expirations.map(|e| flatten(e.date)).unwrap_or_default())
    }

    /// Chain with greeks for one expiration
    pub async fn get_chain(&self, symbol: &str, expiration: &str) -> Result<Vec<OptionContract>> {
        let response: ChainResponse = self
            .get_json(
                "/markets/options/chains",
                &[("symbol", symbol), ("expiration", expiration), ("greeks", "true")],
            )
            .await?;

        Ok(response.options.map(|o| flatten(o.option)).unwrap_or_default())
    }

    async fn get_chain_limited(
        &self,
        permits: &Semaphore,
        symbol: &str,
        expiration: &str,
    ) -> Result<Vec<OptionContract>> {
        let _permit = permits
            .acquire()
            .await
            .map_err(|e| GexError::Tradier(e.to_string()))?;
        self.get_chain(symbol, expiration).await
    }

    /// Download every expiration's chain, at most `max_concurrent_requests` in flight
    pub async fn download_option_chain(&self, symbol: &str) -> Result<Vec<OptionContract>> {
        let expirations = self.get_expirations(symbol).await?;
        log_tradier!(Level::INFO, "Downloading {} expirations for {}", expirations.len(), symbol);

        let permits = Semaphore::new(self.max_concurrent_requests);
        let mut requests = Vec::with_capacity(expirations.len());
        for expiration in &expirations {
            requests.push(self.get_chain_limited(&permits, symbol, expiration));
        }
        let chains = try_join_all(requests).await?;

        let contracts: Vec<OptionContract> = chains.into_iter().flatten().collect();
        log_tradier!(Level::INFO, "Downloaded {} contracts for {}", contracts.len(), symbol);

        Ok(contracts)
    }

    /// Full option chain, served from the cache unless `force_download`
    pub async fn get_option_chain(
        &self,
        symbol: &str,
        force_download: bool,
    ) -> Result<Vec<OptionContract>> {
        let symbol = normalize_symbol(symbol)?;
        let now = OffsetDateTime::now_utc();

        if !force_download {
            match self.cache.load(&symbol, now) {
                Ok(Some(contracts)) => {
                    self.metrics.record_cache_hit();
                    return Ok(contracts);
                }
                Ok(None) => self.metrics.record_cache_miss(),
                Err(e) => {
                    self.metrics.record_cache_miss();
                    tracing::warn!(target: "cache", "Cache read failed for {}: {}", symbol, e);
                }
            }
        }

        let contracts = self.download_option_chain(&symbol).await?;

        // Unknown symbols come back empty; keep them out of the cache
        if contracts.is_empty() {
            log_tradier!(Level::WARN, "No option chain for {}", symbol);
        } else if let Err(e) = self.cache.store(&symbol, &contracts, now) {
            tracing::warn!(target: "cache", "Cache write failed for {}: {}", symbol, e);
        }

        Ok(contracts)
    }
}

/// `start` parameter for time and sales: a few sessions back, in Eastern time
///
/// Weekends reach back further so the window still covers three sessions.
pub fn timesales_start(now: OffsetDateTime) -> Result<String> {
    let eastern = now - time::Duration::hours(EASTERN_OFFSET_HOURS);

    let lookback_days = match eastern.weekday() {
        Weekday::Sunday => 5,
        Weekday::Saturday => 4,
        _ => 3,
    };

    (eastern - time::Duration::days(lookback_days))
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
        .map_err(|e| GexError::InvalidInput(format!("failed to format start time: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionType;
    use crate::infrastructure::config::CacheConfig;
    use crate::test_utils::contract;
    use axum::{routing::get, Json, Router};
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use time::macros::datetime;

    /// Serve canned expirations and chain bodies on an ephemeral local port
    async fn stub_tradier(expirations: Value, chain: Value) -> String {
        let app = Router::new()
            .route(
                "/markets/options/expirations",
                get(move || async move { Json(expirations) }),
            )
            .route("/markets/options/chains", get(move || async move { Json(chain) }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn cached_client(base_url: &str, cache: ChainCache) -> TradierClient {
        let config = TradierConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..TradierConfig::default()
        };
        TradierClient::with_token(&config, "test-token", cache, Arc::new(MetricsCollector::new()))
            .unwrap()
    }

    fn test_client(base_url: &str) -> TradierClient {
        let config = TradierConfig {
            base_url: base_url.to_string(),
            ..TradierConfig::default()
        };
        let metrics = Arc::new(MetricsCollector::new());
        TradierClient::with_token(&config, "test-token", ChainCache::disabled(), metrics).unwrap()
    }

    #[test]
    fn test_timesales_start_weekday() {
        // Wednesday
        let start = timesales_start(datetime!(2024-01-10 20:00 UTC)).unwrap();
        assert_eq!(start, "2024-01-07 16:00");
    }

    #[test]
    fn test_timesales_start_weekend() {
        // Saturday and Sunday reach back to Tuesday
        let saturday = timesales_start(datetime!(2024-01-06 12:00 UTC)).unwrap();
        let sunday = timesales_start(datetime!(2024-01-07 14:00 UTC)).unwrap();
        assert_eq!(saturday, "2024-01-02 08:00");
        assert_eq!(sunday, "2024-01-02 10:00");
    }

    #[test]
    fn test_timesales_start_early_monday_utc_is_sunday_eastern() {
        let start = timesales_start(datetime!(2024-01-08 02:00 UTC)).unwrap();
        assert_eq!(start, "2024-01-02 22:00");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = test_client("https://sandbox.tradier.com/v1/");
        assert_eq!(client.base_url, "https://sandbox.tradier.com/v1");
        assert_eq!(client.max_concurrent_requests, 4);
    }

    #[test]
    fn test_missing_token_env() {
        let config = TradierConfig {
            access_token_env: "GEX_TEST_TOKEN_THAT_IS_NEVER_SET".to_string(),
            ..TradierConfig::default()
        };
        let metrics = Arc::new(MetricsCollector::new());
        let result = TradierClient::new(&config, ChainCache::disabled(), metrics);
        assert!(matches!(result, Err(GexError::Config(_))));
    }

    #[tokio::test]
    async fn test_invalid_symbol_never_hits_network() {
        let metrics = Arc::new(MetricsCollector::new());
        let client = TradierClient::with_token(
            &TradierConfig::default(),
            "test-token",
            ChainCache::disabled(),
            metrics.clone(),
        )
        .unwrap();

        let result = client.get_quote("   ").await;
        assert!(matches!(result, Err(GexError::InvalidInput(_))));
        assert_eq!(metrics.snapshot().upstream_requests, 0);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_tradier_error() {
        // Port 9 (discard) is closed on test machines
        let metrics = Arc::new(MetricsCollector::new());
        let client = TradierClient::with_token(
            &TradierConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                timeout_secs: 2,
                ..TradierConfig::default()
            },
            "test-token",
            ChainCache::disabled(),
            metrics.clone(),
        )
        .unwrap();

        let result = client.get_expirations("SPY").await;
        assert!(matches!(result, Err(GexError::Tradier(_))));
        assert_eq!(metrics.snapshot().upstream_requests, 1);
        assert_eq!(metrics.snapshot().upstream_failures, 1);
    }

    #[tokio::test]
    async fn test_empty_download_is_not_cached() {
        let temp_dir = tempdir().unwrap();
        let cache = ChainCache::new(CacheConfig {
            dir: temp_dir.path().to_path_buf(),
            max_age_minutes: 60,
            enabled: true,
        })
        .unwrap();
        let base_url =
            stub_tradier(json!({ "expirations": null }), json!({ "options": null })).await;
        let client = cached_client(&base_url, cache.clone());

        let contracts = client.get_option_chain("ZZZZ", false).await.unwrap();

        assert!(contracts.is_empty());
        assert!(cache.list_cached().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_downloaded_chain_is_cached() {
        let temp_dir = tempdir().unwrap();
        let cache = ChainCache::new(CacheConfig {
            dir: temp_dir.path().to_path_buf(),
            max_age_minutes: 60,
            enabled: true,
        })
        .unwrap();
        let option = contract(100.0, OptionType::Call, 10, Some(0.05), "2024-03-15");
        let base_url = stub_tradier(
            json!({ "expirations": { "date": "2024-03-15" } }),
            json!({ "options": { "option": option } }),
        )
        .await;
        let client = cached_client(&base_url, cache.clone());

        let contracts = client.get_option_chain("spy", false).await.unwrap();

        assert_eq!(contracts, vec![option]);
        assert_eq!(cache.list_cached().unwrap(), vec!["SPY".to_string()]);
        assert_eq!(client.metrics.snapshot().upstream_requests, 2);
    }
}
