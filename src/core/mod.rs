//! Core domain types
//!
//! This module contains the fundamental types used throughout the system:
//! - OptionType: Call/Put with exposure sign
//! - Strike: Price level keyed in integer cents
//! - Quote, Ohlc, OhlcInterval: Market data served to the frontend

pub mod market;
pub mod option;

pub use market::{Ohlc, OhlcInterval, Quote};
pub use option::{OptionType, Strike};
