//! Gamma exposure (GEX) by strike
//!
//! Exposure of one contract is `gamma * open_interest`, positive for calls
//! and negative for puts. Two views are offered:
//! - by price: upstream greeks bucketed at each contract's strike
//! - aggregate: every contract re-priced with Black-Scholes at every strike
//!   of the chain, summed into the contract's own strike bucket
//! - spot profile: the same re-pricing, bucketed at the hypothetical
//!   underlying price
//!
//! The re-priced views are O(strikes x contracts) and are split across
//! scoped worker threads. Each worker owns a disjoint set of buckets, so the
//! summation order per bucket is the same as a sequential fold.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::analysis::black_scholes::gamma;
use crate::core::{OptionType, Strike};
use crate::infrastructure::config::AnalysisConfig;
use crate::tradier::models::OptionContract;
use crate::{GexError, Result};

/// Default cap on |gamma|; larger values are treated as bad upstream data
pub const DEFAULT_MAX_ABS_GAMMA: f64 = 1.0;

const DAYS_PER_YEAR: f64 = 365.0;

/// Request options for a gamma exposure query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GammaExposureOptions {
    /// Re-evaluate the whole chain across the strike grid
    pub aggregate: bool,
    /// With `aggregate`, key buckets by hypothetical underlying price
    pub spot_profile: bool,
    /// Bypass the on-disk chain cache
    pub force_download: bool,
}

/// Exposure at one price level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaExposure {
    pub strike: Strike,
    pub gamma_exposure: f64,
}

impl GammaExposure {
    pub fn new(strike: Strike, gamma_exposure: f64) -> Self {
        Self {
            strike,
            gamma_exposure,
        }
    }
}

/// Summary statistics over an exposure map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaExposureStats {
    /// Ascending by strike
    pub prices: Vec<GammaExposure>,
    pub average_absolute_exposure: f64,
    pub average_positive_exposure: f64,
    pub average_negative_exposure: f64,
    pub maximum: f64,
    pub minimum: f64,
    pub absolute_maximum: f64,
    pub weighted_average_absolute_price: f64,
    pub weighted_average_positive_price: f64,
    pub weighted_average_negative_price: f64,
}

impl GammaExposureStats {
    /// Compute statistics from a strike -> exposure map
    ///
    /// Zero exposure counts as positive. `maximum` and `minimum` are
    /// anchored at zero. Each side's count is taken as at least 1, so a
    /// one-sided map averages its absolute exposure over `count + 1`. Any
    /// weighted price with a zero denominator is 0.
    pub fn new(exposures: &BTreeMap<Strike, f64>) -> Self {
        let mut positive_sum = 0.0_f64;
        let mut positive_count = 0_usize;
        let mut negative_sum = 0.0_f64;
        let mut negative_count = 0_usize;
        let mut maximum = 0.0_f64;
        let mut minimum = 0.0_f64;
        let mut absolute_maximum = 0.0_f64;
        let mut weighted_positive_sum = 0.0_f64;
        let mut weighted_negative_sum = 0.0_f64;

        for (strike, &exposure) in exposures {
            let price = strike.to_f64();
            if exposure >= 0.0 {
                positive_sum += exposure;
                weighted_positive_sum += price * exposure;
                positive_count += 1;
            } else {
                negative_sum += exposure;
                weighted_negative_sum += price * exposure;
                negative_count += 1;
            }
            maximum = maximum.max(exposure);
            minimum = minimum.min(exposure);
            absolute_maximum = absolute_maximum.max(exposure.abs());
        }

        let positive_count = positive_count.max(1);
        let negative_count = negative_count.max(1);
        let absolute_sum = positive_sum.abs() + negative_sum.abs();

        let prices = exposures
            .iter()
            .map(|(strike, exposure)| GammaExposure::new(*strike, *exposure))
            .collect();

        Self {
            prices,
            average_absolute_exposure: absolute_sum / (positive_count + negative_count) as f64,
            average_positive_exposure: positive_sum / positive_count as f64,
            average_negative_exposure: negative_sum / negative_count as f64,
            maximum,
            minimum,
            absolute_maximum,
            weighted_average_absolute_price: ratio(
                weighted_positive_sum.abs() + weighted_negative_sum.abs(),
                absolute_sum,
            ),
            weighted_average_positive_price: ratio(weighted_positive_sum, positive_sum),
            weighted_average_negative_price: ratio(weighted_negative_sum, negative_sum),
        }
    }
}

#[inline]
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Signed exposure for a single contract
///
/// Gamma outside `[-max_abs_gamma, max_abs_gamma]` or NaN contributes 0.
#[inline]
pub fn exposure_for(
    gamma: f64,
    open_interest: u64,
    option_type: OptionType,
    max_abs_gamma: f64,
) -> f64 {
    if gamma.is_nan() || gamma.abs() > max_abs_gamma {
        return 0.0;
    }
    gamma * open_interest as f64 * option_type.sign()
}

/// Exposure per strike from the upstream greeks
///
/// Contracts without greeks are skipped.
pub fn gamma_exposure_by_price(
    chain: &[OptionContract],
    max_abs_gamma: f64,
) -> BTreeMap<Strike, f64> {
    let mut strike_to_exposure = BTreeMap::new();

    for option in chain {
        let Some(greeks) = &option.greeks else {
            continue;
        };
        let Some(strike) = Strike::from_f64(option.strike) else {
            tracing::warn!("Skipping {} with invalid strike {}", option.symbol, option.strike);
            continue;
        };

        let exposure = exposure_for(
            greeks.gamma,
            option.open_interest,
            option.option_type,
            max_abs_gamma,
        );
        *strike_to_exposure.entry(strike).or_insert(0.0) += exposure;
    }

    strike_to_exposure
}

/// Distinct strikes of the chain, ascending
pub fn strike_grid(chain: &[OptionContract]) -> Vec<Strike> {
    chain
        .iter()
        .filter_map(|o| Strike::from_f64(o.strike))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Contract inputs pre-resolved for the pricing loop
#[derive(Debug, Clone, Copy)]
struct PricedContract {
    sigma: f64,
    expiration_time: f64,
    strike: f64,
    open_interest: u64,
    option_type: OptionType,
}

impl PricedContract {
    fn new(option: &OptionContract, today: Date) -> Result<Self> {
        let days_remaining = days_to_expiry(&option.expiration_date, today)?;
        Ok(Self {
            sigma: option.greeks.as_ref().map(|g| g.mid_iv).unwrap_or(0.0),
            expiration_time: days_remaining as f64 / DAYS_PER_YEAR,
            strike: option.strike,
            open_interest: option.open_interest,
            option_type: option.option_type,
        })
    }

    #[inline]
    fn exposure_at(&self, spot: f64, max_abs_gamma: f64) -> f64 {
        let g = gamma(self.sigma, self.expiration_time, 0.0, spot, self.strike);
        exposure_for(g, self.open_interest, self.option_type, max_abs_gamma)
    }

    /// Summed over `prices` in order
    fn exposure_over(&self, prices: &[f64], max_abs_gamma: f64) -> f64 {
        prices
            .iter()
            .map(|&spot| self.exposure_at(spot, max_abs_gamma))
            .sum()
    }
}

/// Calendar days from `today` to a `YYYY-MM-DD` expiration (may be negative)
pub fn days_to_expiry(expiration_date: &str, today: Date) -> Result<i64> {
    let format = format_description!("[year]-[month]-[day]");
    let expiration = Date::parse(expiration_date.trim(), format).map_err(|e| {
        GexError::Parse(format!("invalid expiration date {:?}: {}", expiration_date, e))
    })?;
    Ok((expiration - today).whole_days())
}

/// Aggregate exposure of the whole chain, bucketed at each contract's strike
///
/// Every contract is re-priced at every strike of the chain (the price
/// grid) and the summed exposure lands in the contract's own strike bucket.
pub fn gamma_exposure_aggregate(
    chain: &[OptionContract],
    today: Date,
    config: &AnalysisConfig,
) -> Result<BTreeMap<Strike, f64>> {
    let grid = strike_grid(chain);
    if grid.is_empty() {
        return Ok(BTreeMap::new());
    }

    let mut by_strike: BTreeMap<Strike, Vec<PricedContract>> = BTreeMap::new();
    for option in chain {
        let Some(strike) = Strike::from_f64(option.strike) else {
            tracing::warn!("Skipping {} with invalid strike {}", option.symbol, option.strike);
            continue;
        };
        by_strike
            .entry(strike)
            .or_default()
            .push(PricedContract::new(option, today)?);
    }
    let buckets: Vec<(Strike, Vec<PricedContract>)> = by_strike.into_iter().collect();
    let prices: Vec<f64> = grid.iter().map(Strike::to_f64).collect();
    let max_abs_gamma = config.max_abs_gamma;

    tracing::debug!("Aggregating {} strikes over {} prices", buckets.len(), prices.len());

    run_chunked(&buckets, config, |chunk| {
        chunk
            .iter()
            .map(|(strike, contracts)| {
                let total = contracts
                    .iter()
                    .map(|c| c.exposure_over(&prices, max_abs_gamma))
                    .sum::<f64>();
                (*strike, total)
            })
            .collect()
    })
}

/// Exposure of the whole chain if the underlying traded at each grid price
///
/// Same price grid as [`gamma_exposure_aggregate`], but each bucket is keyed
/// by the hypothetical underlying price instead of the contract strike.
pub fn gamma_exposure_spot_profile(
    chain: &[OptionContract],
    today: Date,
    config: &AnalysisConfig,
) -> Result<BTreeMap<Strike, f64>> {
    let grid = strike_grid(chain);
    if grid.is_empty() {
        return Ok(BTreeMap::new());
    }

    let contracts = chain
        .iter()
        .map(|o| PricedContract::new(o, today))
        .collect::<Result<Vec<_>>>()?;
    let max_abs_gamma = config.max_abs_gamma;

    tracing::debug!("Profiling {} contracts over {} prices", contracts.len(), grid.len());

    run_chunked(&grid, config, |prices| {
        prices
            .iter()
            .map(|price| {
                let spot = price.to_f64();
                let total = contracts
                    .iter()
                    .map(|c| c.exposure_at(spot, max_abs_gamma))
                    .sum::<f64>();
                (*price, total)
            })
            .collect()
    })
}

/// Split `items` into contiguous chunks across scoped workers
///
/// Each bucket is computed by exactly one worker, so results do not depend
/// on the worker count.
fn run_chunked<T, F>(items: &[T], config: &AnalysisConfig, work: F) -> Result<BTreeMap<Strike, f64>>
where
    T: Sync,
    F: Fn(&[T]) -> Vec<(Strike, f64)> + Sync,
{
    if items.is_empty() {
        return Ok(BTreeMap::new());
    }

    let workers = config.effective_worker_threads().clamp(1, items.len());
    let chunk_size = items.len().div_ceil(workers);
    let work = &work;

    let partials = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move |_| work(chunk)))
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<std::thread::Result<Vec<_>>>()
    })
    .and_then(|joined| joined)
    .map_err(|_| GexError::Analysis("aggregate worker panicked".to_string()))?;

    Ok(partials.into_iter().flatten().collect())
}
