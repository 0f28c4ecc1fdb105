//! Tradier market data
//!
//! REST client for quotes, time and sales and option chains, plus an
//! on-disk cache for chains (they are large and change slowly).

pub mod cache;
pub mod client;
pub mod models;

pub use cache::ChainCache;
pub use client::TradierClient;
pub use models::{Greeks, OptionContract, TimeAndSales};

use crate::{GexError, Result};

/// Normalize a user supplied ticker: trimmed, uppercased, restricted charset
///
/// Accepts letters, digits, `.` and `-` (e.g. `BRK.B`). The result is also
/// used as a cache file name, so it never starts with `.` or contains `..`.
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();

    if symbol.is_empty() {
        return Err(GexError::InvalidInput("symbol must not be empty".to_string()));
    }
    if symbol.len() > 16 {
        return Err(GexError::InvalidInput(format!("symbol too long: {}", symbol)));
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
        || symbol.starts_with('.')
        || symbol.contains("..")
    {
        return Err(GexError::InvalidInput(format!("invalid symbol: {}", symbol)));
    }

    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" spy ").unwrap(), "SPY");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
        assert!(matches!(normalize_symbol("  "), Err(GexError::InvalidInput(_))));
        assert!(normalize_symbol("SPY&symbols=QQQ").is_err());
        assert!(normalize_symbol("ABCDEFGHIJKLMNOPQ").is_err());
        assert_eq!(normalize_symbol("bf-b").unwrap(), "BF-B");
    }

    #[test]
    fn test_normalize_symbol_rejects_paths() {
        for symbol in ["../../pwn", "..", ".SPY", "SPY..X", "A/B", "a\\b", "/etc"] {
            assert!(
                matches!(normalize_symbol(symbol), Err(GexError::InvalidInput(_))),
                "{} should be rejected",
                symbol
            );
        }
    }
}
