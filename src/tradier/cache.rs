//! Local option chain caching
//!
//! A full chain for a liquid underlying spans dozens of expirations, so
//! chains are kept on disk (`<dir>/<SYMBOL>_chain.json`) and reused until
//! they are older than `max_age_minutes`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use time::OffsetDateTime;

use crate::infrastructure::config::CacheConfig;
use crate::tradier::models::OptionContract;

const FILE_SUFFIX: &str = "_chain.json";

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),
}

/// On-disk file layout
#[derive(Debug, Deserialize)]
struct CachedChain {
    symbol: String,
    /// Unix seconds
    fetched_at: i64,
    contracts: Vec<OptionContract>,
}

#[derive(Debug, Serialize)]
struct CachedChainRef<'a> {
    symbol: &'a str,
    fetched_at: i64,
    contracts: &'a [OptionContract],
}

/// Option chain cache manager
#[derive(Debug, Clone)]
pub struct ChainCache {
    config: CacheConfig,
}

impl ChainCache {
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        // Create cache directory if needed
        if config.enabled {
            fs::create_dir_all(&config.dir)?;
        }

        Ok(Self { config })
    }

    /// Cache that never reads or writes
    pub fn disabled() -> Self {
        Self {
            config: CacheConfig {
                enabled: false,
                ..CacheConfig::default()
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Cache file for a symbol, always directly inside the cache directory
    fn path(&self, symbol: &str) -> Result<PathBuf, CacheError> {
        if symbol.is_empty()
            || symbol.starts_with('.')
            || symbol.contains(['/', '\\', std::path::MAIN_SEPARATOR])
        {
            return Err(CacheError::InvalidKey(symbol.to_string()));
        }

        Ok(self
            .config
            .dir
            .join(format!("{}{}", symbol.to_uppercase(), FILE_SUFFIX)))
    }

    /// Load a chain if present and fresh as of `now`
    ///
    /// Missing, stale and unreadable-JSON entries are all `Ok(None)`.
    pub fn load(
        &self,
        symbol: &str,
        now: OffsetDateTime,
    ) -> Result<Option<Vec<OptionContract>>, CacheError> {
        if !self.config.enabled {
            return Ok(None);
        }

        let path = self.path(symbol)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io(e)),
        };

        let cached: CachedChain = match serde_json::from_str(&json) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(target: "cache", "Ignoring corrupt cache file {:?}: {}", path, e);
                return Ok(None);
            }
        };

        if !cached.symbol.eq_ignore_ascii_case(symbol) {
            tracing::warn!(
                target: "cache",
                "Cache file {:?} holds {}, expected {}",
                path,
                cached.symbol,
                symbol
            );
            return Ok(None);
        }

        let age_secs = now.unix_timestamp() - cached.fetched_at;
        let max_age_secs = self.config.max_age_minutes.saturating_mul(60) as i64;
        if age_secs < 0 || age_secs >= max_age_secs {
            tracing::debug!(
                target: "cache",
                "Cached chain for {} is stale ({}s old)",
                symbol,
                age_secs
            );
            return Ok(None);
        }

        tracing::info!(
            target: "cache",
            "Loaded {} contracts for {} from cache",
            cached.contracts.len(),
            symbol
        );
        Ok(Some(cached.contracts))
    }

    /// Save a chain fetched at `now`
    pub fn store(
        &self,
        symbol: &str,
        contracts: &[OptionContract],
        now: OffsetDateTime,
    ) -> Result<(), CacheError> {
        if !self.config.enabled {
            return Ok(());
        }

        let path = self.path(symbol)?;
        let entry = CachedChainRef {
            symbol,
            fetched_at: now.unix_timestamp(),
            contracts,
        };
        let json =
            serde_json::to_string(&entry).map_err(|e| CacheError::Serialization(e.to_string()))?;

        // Write then rename so readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        tracing::info!(
            target: "cache",
            "Cached {} contracts for {} at {:?}",
            contracts.len(),
            symbol,
            path
        );
        Ok(())
    }

    /// Remove the cached chain for a symbol
    pub fn clear(&self, symbol: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.path(symbol)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    /// List cached symbols
    pub fn list_cached(&self) -> Result<Vec<String>, CacheError> {
        let mut symbols = Vec::new();

        if !self.config.dir.exists() {
            return Ok(symbols);
        }

        for entry in fs::read_dir(&self.config.dir)? {
            let file_name = entry?.file_name().to_string_lossy().to_string();
            if let Some(symbol) = file_name.strip_suffix(FILE_SUFFIX) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionType;
    use crate::test_utils::contract;
    use tempfile::tempdir;
    use time::Duration;

    fn cache_in(dir: &std::path::Path, max_age_minutes: u64) -> ChainCache {
        ChainCache::new(CacheConfig {
            dir: dir.to_path_buf(),
            max_age_minutes,
            enabled: true,
        })
        .unwrap()
    }

    #[test]
    fn test_cache_operations() {
        let temp_dir = tempdir().unwrap();
        let cache = cache_in(temp_dir.path(), 60);
        let now = OffsetDateTime::now_utc();
        let chain = vec![
            contract(100.0, OptionType::Call, 10, Some(0.05), "2024-03-15"),
            contract(100.0, OptionType::Put, 20, None, "2024-03-15"),
        ];

        assert_eq!(cache.load("SPY", now).unwrap(), None);

        cache.store("SPY", &chain, now).unwrap();
        assert_eq!(cache.load("spy", now).unwrap(), Some(chain));
        assert_eq!(cache.list_cached().unwrap(), vec!["SPY".to_string()]);

        cache.clear("SPY").unwrap();
        assert_eq!(cache.load("SPY", now).unwrap(), None);
        // Clearing twice is fine
        cache.clear("SPY").unwrap();
    }

    #[test]
    fn test_cache_expiry() {
        let temp_dir = tempdir().unwrap();
        let cache = cache_in(temp_dir.path(), 30);
        let fetched = OffsetDateTime::now_utc();
        let chain = vec![contract(50.0, OptionType::Call, 1, Some(0.1), "2024-03-15")];

        cache.store("QQQ", &chain, fetched).unwrap();

        let load_at = |minutes| cache.load("QQQ", fetched + Duration::minutes(minutes)).unwrap();
        assert!(load_at(29).is_some());
        assert!(load_at(30).is_none());
    }

    #[test]
    fn test_corrupt_file_is_a_miss() {
        let temp_dir = tempdir().unwrap();
        let cache = cache_in(temp_dir.path(), 60);
        fs::write(temp_dir.path().join("IWM_chain.json"), "{not json").unwrap();

        assert_eq!(cache.load("IWM", OffsetDateTime::now_utc()).unwrap(), None);
    }

    #[test]
    fn test_keys_cannot_leave_cache_dir() {
        let temp_dir = tempdir().unwrap();
        let cache_dir = temp_dir.path().join("data").join("cache");
        let cache = cache_in(&cache_dir, 60);
        let now = OffsetDateTime::now_utc();
        let chain = vec![contract(50.0, OptionType::Call, 1, Some(0.1), "2024-03-15")];

        for key in ["../../pwn", "..", "", "a/b", "a\\b", ".hidden"] {
            assert!(matches!(cache.store(key, &chain, now), Err(CacheError::InvalidKey(_))));
            assert!(matches!(cache.load(key, now), Err(CacheError::InvalidKey(_))));
            assert!(matches!(cache.clear(key), Err(CacheError::InvalidKey(_))));
        }

        assert!(!temp_dir.path().join("PWN_chain.json").exists());
        assert!(fs::read_dir(&cache_dir).unwrap().next().is_none());
    }

    #[test]
    fn test_disabled_cache() {
        let cache = ChainCache::disabled();
        let now = OffsetDateTime::now_utc();
        let chain = vec![contract(50.0, OptionType::Call, 1, Some(0.1), "2024-03-15")];

        assert!(!cache.is_enabled());
        cache.store("SPY", &chain, now).unwrap();
        assert_eq!(cache.load("SPY", now).unwrap(), None);
    }
}
