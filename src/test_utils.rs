//! Test fixtures for option chains
//!
//! Contracts built here carry `mid_iv = 0.25` whenever greeks are present.

use crate::core::OptionType;
use crate::tradier::models::{Greeks, OptionContract};

/// Implied volatility attached to fixture greeks
pub const FIXTURE_MID_IV: f64 = 0.25;

/// Build one contract; `gamma = None` leaves greeks out entirely
pub fn contract(
    strike: f64,
    option_type: OptionType,
    open_interest: u64,
    gamma: Option<f64>,
    expiration_date: &str,
) -> OptionContract {
    let type_code = match option_type {
        OptionType::Call => 'C',
        OptionType::Put => 'P',
    };

    OptionContract {
        symbol: format!(
            "TEST{}{}{:08}",
            expiration_date.replace('-', ""),
            type_code,
            (strike * 1000.0) as u64
        ),
        underlying: Some("TEST".to_string()),
        strike,
        option_type,
        open_interest,
        expiration_date: expiration_date.to_string(),
        greeks: gamma.map(|gamma| Greeks {
            gamma,
            mid_iv: FIXTURE_MID_IV,
            ..Greeks::default()
        }),
    }
}

/// Small two-expiration chain with strikes 95, 100 and 105
pub fn sample_chain() -> Vec<OptionContract> {
    vec![
        contract(95.0, OptionType::Put, 800, Some(0.020), "2024-03-15"),
        contract(100.0, OptionType::Call, 1200, Some(0.045), "2024-03-15"),
        contract(100.0, OptionType::Put, 900, Some(0.045), "2024-03-15"),
        contract(105.0, OptionType::Call, 600, Some(0.030), "2024-03-15"),
        contract(100.0, OptionType::Call, 400, Some(0.025), "2024-04-19"),
        contract(105.0, OptionType::Put, 300, None, "2024-04-19"),
    ]
}
