//! Configuration management
//!
//! Loads configuration from config.toml at startup.
//! All values are configurable to avoid hardcoded constants.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Backend configuration
///
/// Loaded from config.toml at startup. Every section and field falls back
/// to a default so a partial file is valid.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// API server settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Tradier REST settings
    #[serde(default)]
    pub tradier: TradierConfig,

    /// Option chain cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Gamma exposure settings
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Bind address
    #[serde(default = "default_api_host")]
    pub host: String,

    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,
}

/// Tradier API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradierConfig {
    /// REST base URL (production or sandbox)
    #[serde(default = "default_tradier_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Parallel chain requests when downloading all expirations
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

/// Option chain cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Cache directory
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,

    /// Maximum age before a cached chain is downloaded again
    #[serde(default = "default_max_age_minutes")]
    pub max_age_minutes: u64,

    /// Whether to use cache
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Gamma exposure configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Gamma above this magnitude is treated as bad data
    #[serde(default = "default_max_abs_gamma")]
    pub max_abs_gamma: f64,

    /// Worker threads for aggregate calculations (0 = all cores)
    #[serde(default)]
    pub worker_threads: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory for rolling log files
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Filter used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

impl Default for TradierConfig {
    fn default() -> Self {
        Self {
            base_url: default_tradier_base_url(),
            access_token_env: default_access_token_env(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            max_age_minutes: default_max_age_minutes(),
            enabled: true,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_abs_gamma: default_max_abs_gamma(),
            worker_threads: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            level: default_log_level(),
        }
    }
}

impl AnalysisConfig {
    /// Worker count with 0 resolved to the machine's parallelism
    pub fn effective_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    3030
}

fn default_tradier_base_url() -> String {
    "https://api.tradier.com/v1".to_string()
}

fn default_access_token_env() -> String {
    "TRADIER_ACCESS_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}

fn default_max_age_minutes() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_max_abs_gamma() -> f64 {
    crate::analysis::gamma_exposure::DEFAULT_MAX_ABS_GAMMA
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from config.toml file
    ///
    /// The path can be overridden with `CONFIG_PATH`.
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File not found - use defaults
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Reject values that would only fail later at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = &self.tradier.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "tradier.base_url must be an http(s) URL, got {:?}",
                self.tradier.base_url
            )));
        }
        if self.tradier.max_concurrent_requests == 0 {
            return Err(ConfigError::Invalid(
                "tradier.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.tradier.timeout_secs == 0 {
            return Err(ConfigError::Invalid("tradier.timeout_secs must be at least 1".to_string()));
        }
        if !(self.analysis.max_abs_gamma > 0.0) {
            return Err(ConfigError::Invalid(
                "analysis.max_abs_gamma must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading file
    IoError(std::io::Error),
    /// Parse error (invalid TOML)
    ParseError(String),
    /// Value out of range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::ParseError(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(e) => write!(f, "Invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(_) | ConfigError::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.api.port, 3030);
        assert_eq!(config.tradier.base_url, "https://api.tradier.com/v1");
        assert_eq!(config.tradier.access_token_env, "TRADIER_ACCESS_TOKEN");
        assert_eq!(config.cache.dir, PathBuf::from("data/cache"));
        assert!(config.cache.enabled);
        assert_eq!(config.analysis.max_abs_gamma, 1.0);
        assert_eq!(config.analysis.worker_threads, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [api]
            port = 8080

            [tradier]
            base_url = "https://sandbox.tradier.com/v1"

            [analysis]
            worker_threads = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.tradier.base_url, "https://sandbox.tradier.com/v1");
        assert_eq!(config.tradier.timeout_secs, 30);
        assert_eq!(config.analysis.effective_worker_threads(), 2);
        assert_eq!(config.cache.max_age_minutes, 60);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[api]\nport = \"not a port\"");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.tradier.base_url = "api.tradier.com".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.tradier.max_concurrent_requests = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.analysis.max_abs_gamma = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_worker_threads_auto() {
        let config = AnalysisConfig::default();
        assert!(config.effective_worker_threads() >= 1);
    }
}
