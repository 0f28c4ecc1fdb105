//! Gamma exposure analytics backend
//!
//! Pulls quotes, time and sales, and option chains from Tradier, computes
//! per-strike gamma exposure and serves the results over HTTP.

pub mod analysis;
pub mod core;
pub mod engine;
pub mod infrastructure;
pub mod tradier;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use engine::AppEngine;
pub use infrastructure::config::{AnalysisConfig, ApiConfig, CacheConfig, Config, TradierConfig};

use thiserror::Error;

/// Main error type for the backend
#[derive(Error, Debug)]
pub enum GexError {
    #[error("Tradier request failed: {0}")]
    Tradier(String),

    #[error("Tradier returned HTTP {0}: {1}")]
    Http(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Cache error: {0}")]
    Cache(#[from] tradier::cache::CacheError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GexError>;
