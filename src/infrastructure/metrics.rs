//! Metrics collection for system monitoring
//!
//! Lock-free counters using atomic operations.
//! Updated by the API handlers and the Tradier client, exported via
//! `/api/status`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

/// System metrics collector
pub struct MetricsCollector {
    /// Requests served by the HTTP API
    api_requests: AtomicU64,
    /// Requests sent to Tradier
    upstream_requests: AtomicU64,
    /// Tradier requests that failed (network, status or decode)
    upstream_failures: AtomicU64,
    /// Option chains served from disk
    cache_hits: AtomicU64,
    /// Option chains downloaded because the cache had nothing usable
    cache_misses: AtomicU64,
    /// Latency of the most recent Tradier request (millis)
    last_upstream_latency_ms: AtomicU64,
    /// Last upstream response timestamp (Unix millis)
    last_upstream_time: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

/// Metrics snapshot for API export
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub api_requests: u64,
    pub upstream_requests: u64,
    pub upstream_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub last_upstream_latency_ms: u64,
    pub last_upstream_time: u64,
    pub request_rate: f64, // API requests per second
    pub uptime_seconds: u64,
}

impl MetricsCollector {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            api_requests: AtomicU64::new(0),
            upstream_requests: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            last_upstream_latency_ms: AtomicU64::new(0),
            last_upstream_time: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    #[inline]
    pub fn record_api_request(&self) {
        self.api_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_upstream_request(&self) {
        self.upstream_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed upstream round trip
    pub fn record_upstream_latency(&self, latency: Duration) {
        self.last_upstream_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);

        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.last_upstream_time.store(now, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let api_requests = self.api_requests.load(Ordering::Relaxed);

        let uptime = self.start_time.elapsed().as_secs();
        let rate = if uptime > 0 {
            api_requests as f64 / uptime as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            api_requests,
            upstream_requests: self.upstream_requests.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            last_upstream_latency_ms: self.last_upstream_latency_ms.load(Ordering::Relaxed),
            last_upstream_time: self.last_upstream_time.load(Ordering::Relaxed),
            request_rate: rate,
            uptime_seconds: uptime,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new();
        let snapshot = collector.snapshot();

        assert_eq!(snapshot.api_requests, 0);
        assert_eq!(snapshot.upstream_requests, 0);
        assert_eq!(snapshot.cache_hits, 0);
        assert_eq!(snapshot.last_upstream_time, 0);
    }

    #[test]
    fn test_record_counters() {
        let collector = MetricsCollector::new();

        collector.record_api_request();
        collector.record_api_request();
        collector.record_upstream_request();
        collector.record_upstream_failure();
        collector.record_cache_hit();
        collector.record_cache_miss();
        collector.record_cache_miss();

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.api_requests, 2);
        assert_eq!(snapshot.upstream_requests, 1);
        assert_eq!(snapshot.upstream_failures, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.cache_misses, 2);
    }

    #[test]
    fn test_upstream_latency() {
        let collector = MetricsCollector::new();
        collector.record_upstream_latency(Duration::from_millis(250));

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.last_upstream_latency_ms, 250);
        assert!(snapshot.last_upstream_time > 0);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let json = serde_json::to_value(MetricsCollector::new().snapshot()).unwrap();
        assert!(json.get("cacheHits").is_some());
        assert!(json.get("uptimeSeconds").is_some());
    }
}
