//! Criterion benchmarks for engine hot paths.
//!
//! Benchmarks:
//! 1. Black-Scholes pricing with Greeks
//! 2. Delta-targeted strike solve
//! 3. Full strategy build
//! 4. Universe ranking at several universe sizes
//! 5. Short momentum plus trend filters

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use momentumlab_core::domain::{PriceSeries, UniverseCandidate};
use momentumlab_core::momentum::{evaluate_short_filters, short_momentum, ShortSignalParams};
use momentumlab_core::pricing::{price, OptionKind, PricingInput};
use momentumlab_core::solver::StrikeSolver;
use momentumlab_core::strategy::{StrategyBuilder, UnderlyingSnapshot, VolatilityInputs};
use momentumlab_core::universe::{rank_universe, UniverseFilter};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_candidates(n: usize) -> Vec<UniverseCandidate> {
    (0..n)
        .map(|i| {
            let mc = 1e9 * (1.0 + (i as f64 * 0.37).sin().abs() * 500.0);
            let adv = 1e7 * (1.0 + (i as f64 * 0.11).cos().abs() * 100.0);
            UniverseCandidate::new(format!("T{i:04}"), mc, adv, 20.0 + i as f64 % 300.0)
        })
        .collect()
}

fn make_series(n: usize) -> PriceSeries {
    let closes: Vec<f64> = (0..n)
        .map(|i| 100.0 - i as f64 * 0.05 + (i as f64 * 0.1).sin() * 3.0)
        .collect();
    let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    PriceSeries::from_closes("BENCH", start, &closes).unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_pricing(c: &mut Criterion) {
    let input = PricingInput::from_dte(100.0, 95.0, 45, 0.02, 0.30, OptionKind::Put);
    c.bench_function("black_scholes_put", |b| b.iter(|| price(black_box(&input))));
}

fn bench_solver(c: &mut Criterion) {
    let solver = StrikeSolver::default();
    let template = PricingInput::from_dte(100.0, 100.0, 45, 0.02, 0.30, OptionKind::Put);
    c.bench_function("strike_solve_30_delta", |b| {
        b.iter(|| solver.solve(black_box(&template), black_box(-0.30)))
    });
}

fn bench_strategy_build(c: &mut Criterion) {
    let builder = StrategyBuilder::default();
    let snapshot = UnderlyingSnapshot {
        ticker: "BENCH".into(),
        as_of: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        spot: 100.0,
        risk_free_rate: 0.02,
        volatility: VolatilityInputs {
            implied_vol: 0.35,
            iv_rank: Some(35.0),
            realized_vol_30d: 0.33,
        },
        expiries: Vec::new(),
    };
    c.bench_function("strategy_build_spread", |b| b.iter(|| builder.build(black_box(&snapshot))));
}

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_universe");
    for n in [100, 1_000, 5_000] {
        let candidates = make_candidates(n);
        let filter = UniverseFilter::long();
        group.bench_with_input(BenchmarkId::from_parameter(n), &candidates, |b, cands| {
            b.iter(|| rank_universe(black_box(cands), &filter, 50))
        });
    }
    group.finish();
}

fn bench_short_momentum(c: &mut Criterion) {
    let series = make_series(260);
    let params = ShortSignalParams::default();
    c.bench_function("short_momentum_with_filters", |b| {
        b.iter(|| {
            let record = short_momentum(black_box(&series)).unwrap();
            evaluate_short_filters(&series, &record, &params)
        })
    });
}

criterion_group!(
    benches,
    bench_pricing,
    bench_solver,
    bench_strategy_build,
    bench_ranking,
    bench_short_momentum
);
criterion_main!(benches);
