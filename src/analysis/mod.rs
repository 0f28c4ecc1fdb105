//! Option chain analytics
//!
//! - Black-Scholes gamma kernel
//! - Gamma exposure by strike (upstream greeks)
//! - Aggregate gamma exposure and spot profile across the strike grid (parallel)

pub mod black_scholes;
pub mod gamma_exposure;

pub use gamma_exposure::{
    gamma_exposure_aggregate, gamma_exposure_by_price, gamma_exposure_spot_profile, GammaExposure,
    GammaExposureOptions, GammaExposureStats,
};
