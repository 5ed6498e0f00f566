//! Property tests for cycle orchestration.
//!
//! Uses proptest to verify:
//! 1. Synthetic snapshots are weekday-only, ordered and positive for any seed
//! 2. Serial and parallel short cycles agree for any seed
//! 3. Short candidates never exceed Top-N and ENTER always carries a structure

use chrono::{Datelike, NaiveDate, Weekday};
use proptest::prelude::*;

use momentumlab_core::entry::EntryDecision;
use momentumlab_runner::config::EngineConfig;
use momentumlab_runner::cycle::CycleRunner;
use momentumlab_runner::synthetic::{generate_snapshot, SyntheticSpec};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

fn arb_tickers() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[A-Z]{2,5}", 1..12).prop_map(|s| s.into_iter().collect())
}

fn spec(tickers: Vec<String>, seed: u64, days: usize) -> SyntheticSpec {
    SyntheticSpec {
        tickers,
        end: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        trading_days: days,
        seed,
        risk_free_rate: 0.05,
    }
}

// ── Properties ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn synthetic_series_are_well_formed(seed in arb_seed(), tickers in arb_tickers(), days in 2usize..300) {
        let snap = generate_snapshot(&spec(tickers.clone(), seed, days)).unwrap();
        prop_assert_eq!(snap.series.len(), tickers.len());
        for series in snap.series.values() {
            prop_assert_eq!(series.len(), days);
            for bar in series.bars() {
                prop_assert!(!matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun));
                prop_assert!(bar.close > 0.0 && bar.close.is_finite());
            }
            for pair in series.bars().windows(2) {
                prop_assert!(pair[0].date < pair[1].date);
            }
        }
        for quote in snap.volatility.values() {
            prop_assert!(quote.implied_vol > 0.0);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn short_cycle_is_order_independent(seed in arb_seed(), tickers in arb_tickers()) {
        let snap = generate_snapshot(&spec(tickers, seed, 260)).unwrap();
        let cfg = EngineConfig::default();
        let serial = CycleRunner::new(&cfg).with_parallelism(false).short(&snap);
        let parallel = CycleRunner::new(&cfg).with_parallelism(true).short(&snap);
        prop_assert_eq!(
            serde_json::to_string(&serial).unwrap(),
            serde_json::to_string(&parallel).unwrap()
        );

        prop_assert!(serial.candidates.len() <= cfg.short.top_n);
        for c in serial.entries() {
            prop_assert_eq!(c.decision, EntryDecision::Enter);
            prop_assert!(c.strategy.strategy().is_some());
        }
    }
}
