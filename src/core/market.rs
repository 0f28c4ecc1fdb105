//! Market data types served to the frontend
//!
//! Quote and Ohlc are the chart-facing shapes. Tradier's raw payloads are
//! converted into these in `tradier::models`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar interval for time and sales
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OhlcInterval {
    #[serde(rename = "tick")]
    Tick,
    #[serde(rename = "1min")]
    OneMinute,
    #[default]
    #[serde(rename = "5min")]
    FiveMinute,
    #[serde(rename = "15min")]
    FifteenMinute,
}

impl OhlcInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            OhlcInterval::Tick => "tick",
            OhlcInterval::OneMinute => "1min",
            OhlcInterval::FiveMinute => "5min",
            OhlcInterval::FifteenMinute => "15min",
        }
    }
}

impl fmt::Display for OhlcInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OhlcInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tick" => Ok(OhlcInterval::Tick),
            "1min" => Ok(OhlcInterval::OneMinute),
            "5min" => Ok(OhlcInterval::FiveMinute),
            "15min" => Ok(OhlcInterval::FifteenMinute),
            other => Err(format!("unknown interval: {}", other)),
        }
    }
}

/// Latest quote for an underlying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub description: Option<String>,
    pub last: Option<f64>,
    pub change: Option<f64>,
    pub change_percentage: Option<f64>,
    pub volume: Option<u64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub prevclose: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub week_52_high: Option<f64>,
    pub week_52_low: Option<f64>,
}

/// One OHLC bar for the price/time chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ohlc {
    pub interval: OhlcInterval,
    /// Bar start, exchange local time (`YYYY-MM-DDTHH:MM:SS`)
    pub time: String,
    pub price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub vwap: Option<f64>,
}
