//! Benchmarks for gamma exposure
//!
//! Chain shaped like a liquid index ETF: 200 strikes, 8 expirations.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gex_server::analysis::black_scholes::gamma;
use gex_server::analysis::{
    gamma_exposure_aggregate, gamma_exposure_by_price, gamma_exposure_spot_profile,
};
use gex_server::core::OptionType;
use gex_server::tradier::{Greeks, OptionContract};
use gex_server::AnalysisConfig;
use time::macros::date;

const EXPIRATIONS: [&str; 8] = [
    "2024-03-08", "2024-03-15", "2024-03-22", "2024-03-28",
    "2024-04-19", "2024-05-17", "2024-06-21", "2024-09-20",
];

fn make_chain() -> Vec<OptionContract> {
    let mut chain = Vec::new();
    for expiration in EXPIRATIONS {
        for i in 0..200u64 {
            let strike = 400.0 + i as f64 * 0.5;
            for option_type in [OptionType::Call, OptionType::Put] {
                chain.push(OptionContract {
                    symbol: format!("SPY{}{:?}{}", expiration, option_type, i),
                    underlying: Some("SPY".to_string()),
                    strike,
                    option_type,
                    open_interest: 1_000 + i * 10,
                    expiration_date: expiration.to_string(),
                    greeks: Some(Greeks {
                        gamma: 0.01,
                        mid_iv: 0.18,
                        ..Greeks::default()
                    }),
                });
            }
        }
    }
    chain
}

fn bench_gamma_kernel(c: &mut Criterion) {
    c.bench_function("bs_gamma", |b| {
        b.iter(|| gamma(black_box(0.2), black_box(0.1), 0.0, black_box(450.0), black_box(455.0)))
    });
}

fn bench_by_price(c: &mut Criterion) {
    let chain = make_chain();
    c.bench_function("gamma_exposure_by_price", |b| {
        b.iter(|| gamma_exposure_by_price(black_box(&chain), 1.0))
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let chain = make_chain();
    let today = date!(2024 - 03 - 01);

    let mut group = c.benchmark_group("gamma_exposure_aggregate");
    group.sample_size(10);
    for workers in [1, 4] {
        let config = AnalysisConfig {
            max_abs_gamma: 1.0,
            worker_threads: workers,
        };
        group.bench_function(format!("workers_{}", workers), |b| {
            b.iter(|| gamma_exposure_aggregate(black_box(&chain), today, &config))
        });
        group.bench_function(format!("spot_profile_workers_{}", workers), |b| {
            b.iter(|| gamma_exposure_spot_profile(black_box(&chain), today, &config))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_gamma_kernel, bench_by_price, bench_aggregate);
criterion_main!(benches);
