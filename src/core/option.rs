//! Option contract primitives
//!
//! `Strike` stores prices as integer cents so that map keys order
//! numerically ("95" sorts before "100").

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Exposure direction: +1 for call, -1 for put
    #[inline(always)]
    pub const fn sign(&self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }
}

/// Strike or hypothetical underlying price in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Strike(u64);

impl Strike {
    /// Cents per unit
    pub const SCALE: f64 = 100.0;

    /// Convert from a float price, rounding to the nearest cent
    ///
    /// Returns `None` for negative or non-finite prices.
    #[inline]
    pub fn from_f64(price: f64) -> Option<Self> {
        if !price.is_finite() || price < 0.0 {
            return None;
        }
        Some(Self((price * Self::SCALE).round() as u64))
    }

    #[inline(always)]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    #[inline(always)]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    #[inline(always)]
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE
    }
}

impl fmt::Display for Strike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

impl FromStr for Strike {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let price: f64 = s
            .trim()
            .parse()
            .map_err(|e| format!("invalid strike {:?}: {}", s, e))?;
        Strike::from_f64(price).ok_or_else(|| format!("invalid strike {:?}", s))
    }
}

impl Serialize for Strike {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Strike {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
