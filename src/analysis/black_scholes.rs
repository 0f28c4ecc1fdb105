//! Black-Scholes gamma
//!
//! Only the second-order spot sensitivity is needed for exposure maps.
//! Degenerate inputs (expired, zero vol, non-positive prices) produce zero
//! gamma instead of NaN or infinity.

use std::f64::consts::PI;

/// Standard normal PDF
#[inline]
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes d1 parameter
#[inline]
pub fn d1(sigma: f64, tau: f64, price: f64, strike: f64, rate: f64) -> f64 {
    ((price / strike).ln() + (rate + 0.5 * sigma * sigma) * tau) / (sigma * tau.sqrt())
}

/// Gamma at `price` for an option struck at `strike`, zero rate
///
/// Times are in years; `expiration_time - current_time` is time to expiry.
#[inline]
pub fn gamma(sigma: f64, expiration_time: f64, current_time: f64, price: f64, strike: f64) -> f64 {
    gamma_with_rate(sigma, expiration_time, current_time, price, strike, 0.0)
}

/// Gamma with a continuously compounded risk-free rate
pub fn gamma_with_rate(
    sigma: f64,
    expiration_time: f64,
    current_time: f64,
    price: f64,
    strike: f64,
    rate: f64,
) -> f64 {
    let tau = expiration_time - current_time;

    // Also rejects NaN inputs
    if !(tau > 0.0 && sigma > 0.0 && price > 0.0 && strike > 0.0) {
        return 0.0;
    }

    let d1 = d1(sigma, tau, price, strike, rate);
    norm_pdf(d1) / (price * sigma * tau.sqrt())
}
