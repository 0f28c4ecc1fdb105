//! Tradier response payloads
//!
//! Tradier collapses single-element arrays into bare objects and replaces
//! empty collections with `null`, so every list goes through `OneOrMany`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::core::{Ohlc, OhlcInterval, OptionType, Quote};

/// A JSON value that is either a list or a single bare element
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Flatten an optional `OneOrMany` into a vec
pub(crate) fn flatten<T>(value: Option<OneOrMany<T>>) -> Vec<T> {
    value.map(OneOrMany::into_vec).unwrap_or_default()
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn null_as_zero_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

// === Quotes ===

#[derive(Debug, Deserialize)]
pub(crate) struct QuotesResponse {
    pub quotes: QuotesInner,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuotesInner {
    #[serde(default)]
    pub quote: Option<OneOrMany<TradierQuote>>,
}

/// Raw quote as returned by `/markets/quotes`
#[derive(Debug, Clone, Deserialize)]
pub struct TradierQuote {
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

impl From<TradierQuote> for Quote {
    fn from(q: TradierQuote) -> Self {
        Self {
            symbol: q.symbol,
            description: q.description,
            last: q.last,
            change: q.change,
            change_percentage: q.change_percentage,
            volume: q.volume,
            open: q.open,
            high: q.high,
            low: q.low,
            close: q.close,
            prevclose: q.prevclose,
            bid: q.bid,
            ask: q.ask,
            week_52_high: q.week_52_high,
            week_52_low: q.week_52_low,
        }
    }
}

// === Time and sales ===

/// One bar from `/markets/timesales`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAndSales {
    pub time: String,
    pub timestamp: u64,
    pub price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub vwap: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimeAndSalesResponse {
    pub series: Option<TimeAndSalesInner>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimeAndSalesInner {
    #[serde(default)]
    pub data: Option<OneOrMany<TimeAndSales>>,
}

impl From<(OhlcInterval, TimeAndSales)> for Ohlc {
    fn from((interval, ts): (OhlcInterval, TimeAndSales)) -> Self {
        Self {
            interval,
            time: ts.time,
            price: ts.price,
            open: ts.open,
            high: ts.high,
            low: ts.low,
            close: ts.close,
            volume: ts.volume,
            vwap: ts.vwap,
        }
    }
}

// === Option chains ===

#[derive(Debug, Deserialize)]
pub(crate) struct ExpirationsResponse {
    pub expirations: Option<ExpirationsInner>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExpirationsInner {
    #[serde(default)]
    pub date: Option<OneOrMany<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChainResponse {
    pub options: Option<ChainInner>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChainInner {
    #[serde(default)]
    pub option: Option<OneOrMany<OptionContract>>,
}

/// One contract from `/markets/options/chains`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// OCC symbol (e.g. `SPY240315C00450000`)
    pub symbol: String,
    #[serde(default)]
    pub underlying: Option<String>,
    pub strike: f64,
    pub option_type: OptionType,
    #[serde(default, deserialize_with = "null_as_zero_u64")]
    pub open_interest: u64,
    /// `YYYY-MM-DD`
    pub expiration_date: String,
    #[serde(default)]
    pub greeks: Option<Greeks>,
}

/// Greeks block (ORATS, refreshed hourly by Tradier)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    #[serde(default, deserialize_with = "null_as_zero")]
    pub delta: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub gamma: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub theta: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub vega: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub rho: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub mid_iv: f64,
    #[serde(default)]
    pub bid_iv: Option<f64>,
    #[serde(default)]
    pub ask_iv: Option<f64>,
    #[serde(default)]
    pub smv_vol: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
