//! Position opening, persistence and exit passes across cycles.
//!
//! Tests:
//! 1. The store survives a save/load round trip with its id sequence
//! 2. Closed positions move from the store file into the audit log
//! 3. An exit pass values priced positions and leaves unpriced ones open
//! 4. Opening skips a ticker that already has an open position
//! 5. A position that cannot be repriced still reaches its time stop
//! 6. A failed store write leaves the audit log untouched

use chrono::NaiveDate;
use std::collections::BTreeMap;

use momentumlab_core::domain::{Direction, PositionId};
use momentumlab_core::entry::{EntryDecision, EntryEvaluation};
use momentumlab_core::lifecycle::{
    LifecycleManager, PendingPosition, PositionObservation, PositionState, PositionStore,
};
use momentumlab_core::momentum::{MomentumRecord, ShortFilterCheck};
use momentumlab_core::strategy::{
    BuildOutcome, OptionStrategy, StrategyBuilder, UnderlyingSnapshot, VolatilityInputs,
};
use momentumlab_runner::config::EngineConfig;
use momentumlab_runner::cycle::{ShortCandidate, ShortCycle};
use momentumlab_runner::manage::{lifecycle_manager, open_entries, run_exit_pass};
use momentumlab_runner::persistence::StoreFile;
use momentumlab_runner::report::MarkdownReport;
use momentumlab_runner::synthetic::{generate_snapshot, SyntheticSpec};

// ── Helpers ──────────────────────────────────────────────────────────

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

fn volatility() -> VolatilityInputs {
    VolatilityInputs {
        implied_vol: 0.35,
        iv_rank: Some(35.0),
        realized_vol_30d: 0.33,
    }
}

fn strategy(ticker: &str) -> OptionStrategy {
    let u = UnderlyingSnapshot {
        ticker: ticker.into(),
        as_of: as_of(),
        spot: 100.0,
        risk_free_rate: 0.02,
        volatility: volatility(),
        expiries: Vec::new(),
    };
    match StrategyBuilder::default().build(&u) {
        BuildOutcome::Built { strategy } => strategy,
        BuildOutcome::Rejected { reason } => panic!("unexpected rejection: {reason}"),
    }
}

fn open(store: &mut PositionStore, ticker: &str) -> PositionId {
    LifecycleManager::default()
        .open(store, PendingPosition::new(strategy(ticker), as_of()), 250_000.0)
        .unwrap()
}

fn candidate(rank: usize, ticker: &str) -> ShortCandidate {
    ShortCandidate {
        rank,
        ticker: ticker.into(),
        record: MomentumRecord {
            ticker: ticker.into(),
            as_of: as_of(),
            score: -0.2,
            components: BTreeMap::new(),
            direction: Direction::Short,
        },
        filters: ShortFilterCheck::default(),
        volatility: volatility(),
        spot: 100.0,
        entry: EntryEvaluation {
            decision: EntryDecision::Enter,
            hard: Vec::new(),
            soft: Vec::new(),
            soft_score: 1.0,
        },
        strategy: BuildOutcome::Built {
            strategy: strategy(ticker),
        },
        decision: EntryDecision::Enter,
    }
}

// ── Persistence ──────────────────────────────────────────────────────

#[test]
fn store_round_trips_with_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let file = StoreFile::new(dir.path().join("positions.json"));

    let mut store = PositionStore::new();
    let first = open(&mut store, "WEAK");
    assert_eq!(file.save(&mut store).unwrap(), 0);

    let mut back = file.load().unwrap();
    assert_eq!(back.open_count(), 1);
    let p = back.get(&first).unwrap();
    assert_eq!(p.ticker(), "WEAK");
    assert_eq!(p.state(), PositionState::Open);
    assert_eq!(p.contract_count(), store.get(&first).unwrap().contract_count());

    // Same strategy, same day: only the persisted sequence keeps ids apart.
    let second = open(&mut back, "WEAK");
    assert_ne!(first, second);
}

#[test]
fn missing_store_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreFile::new(dir.path().join("nothing.json")).load().unwrap();
    assert_eq!(store.open_count(), 0);
}

#[test]
fn closed_positions_move_to_audit_log() {
    let dir = tempfile::tempdir().unwrap();
    let file = StoreFile::new(dir.path().join("positions.json"));
    let manager = LifecycleManager::default();

    let mut store = PositionStore::new();
    let id = open(&mut store, "WEAK");
    let debit = store.get(&id).unwrap().entry_net_debit();
    let observations = BTreeMap::from([(
        id.clone(),
        PositionObservation {
            spot: 90.0,
            sma_50: Some(97.0),
            rsi_14: Some(40.0),
            momentum_score: Some(-0.3),
            days_to_expiry: 30,
            strategy_value: Some(debit * 0.4),
        },
    )]);
    let events = manager.evaluate_exits(&mut store, &observations, as_of() + chrono::Duration::days(10));
    assert_eq!(events[0].state, PositionState::ClosedStopLoss);

    assert_eq!(file.save(&mut store).unwrap(), 1);
    let reloaded = file.load().unwrap();
    assert_eq!(reloaded.open_count(), 0);
    assert!(reloaded.closed().is_empty());

    let history = file.closed_history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id(), &id);
    assert_eq!(history[0].state(), PositionState::ClosedStopLoss);
    assert!(history[0].realized_pnl() < 0.0);
}

#[test]
fn failed_store_write_leaves_audit_log_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let file = StoreFile::new(dir.path().join("positions.json"));
    let manager = LifecycleManager::default();

    let mut store = PositionStore::new();
    let id = open(&mut store, "WEAK");
    let observations = BTreeMap::from([(
        id.clone(),
        PositionObservation {
            spot: 90.0,
            sma_50: Some(97.0),
            rsi_14: Some(40.0),
            momentum_score: Some(-0.3),
            days_to_expiry: 5,
            strategy_value: Some(1.0),
        },
    )]);
    manager.evaluate_exits(&mut store, &observations, as_of() + chrono::Duration::days(30));
    assert_eq!(store.closed().len(), 1);

    // The temp file path is taken by a directory, so the store write fails.
    let blocker = dir.path().join("positions.json.tmp");
    std::fs::create_dir(&blocker).unwrap();
    assert!(file.save(&mut store).is_err());
    assert!(file.closed_history().unwrap().is_empty());
    assert_eq!(store.closed().len(), 1);

    std::fs::remove_dir(&blocker).unwrap();
    assert_eq!(file.save(&mut store).unwrap(), 1);
    assert!(store.closed().is_empty());
    let history = file.closed_history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id(), &id);
}

// ── Exit pass ────────────────────────────────────────────────────────

#[test]
fn exit_pass_values_priced_positions_only() {
    let snap = generate_snapshot(&SyntheticSpec {
        tickers: vec!["WEAK".into()],
        end: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        trading_days: 120,
        seed: 1,
        risk_free_rate: 0.05,
    })
    .unwrap();
    let config = EngineConfig::default();
    let manager = lifecycle_manager(&config);

    let mut store = PositionStore::new();
    let priced = open(&mut store, "WEAK");
    let unpriced = open(&mut store, "GONE");

    let pass = run_exit_pass(&snap, &mut store, &manager, &config);
    assert_eq!(pass.unobserved, vec![unpriced.clone()]);
    assert!(store.get(&unpriced).unwrap().is_open());

    let mark = pass.marks[&priced];
    assert!(mark.is_finite() && mark >= 0.0);
    assert!(pass.events.iter().all(|e| e.position_id == priced));

    let report = MarkdownReport.exits(&pass);
    assert!(report.contains(&unpriced.to_string()));
}

#[test]
fn unpriceable_position_still_hits_time_stop() {
    let mut store = PositionStore::new();
    let id = open(&mut store, "WEAK");
    let expiry = store.get(&id).unwrap().expiry_date();

    let mut snap = generate_snapshot(&SyntheticSpec {
        tickers: vec!["WEAK".into()],
        end: expiry - chrono::Duration::days(9),
        trading_days: 120,
        seed: 4,
        risk_free_rate: 0.05,
    })
    .unwrap();
    // A non-finite rate makes every reprice fail.
    snap.risk_free_rate = f64::NAN;
    let config = EngineConfig::default();
    let manager = lifecycle_manager(&config);
    assert!(store.get(&id).unwrap().days_to_expiry(snap.as_of) <= config.exits.time_stop_days);

    let pass = run_exit_pass(&snap, &mut store, &manager, &config);
    assert!(pass.unobserved.is_empty());
    assert!(!pass.marks.contains_key(&id));
    assert_eq!(pass.events.len(), 1);
    let event = &pass.events[0];
    assert!(matches!(
        event.state,
        PositionState::ClosedTimeStop | PositionState::ClosedRiskEvent
    ));
    assert!(event.strategy_value.is_finite() && event.strategy_value >= 0.0);
    assert_eq!(store.open_count(), 0);
}

// ── Opening ──────────────────────────────────────────────────────────

#[test]
fn opening_skips_tickers_already_held() {
    let cycle = ShortCycle {
        as_of: as_of(),
        config_hash: String::new(),
        dataset_hash: String::new(),
        universe_size: 2,
        candidates: vec![candidate(1, "WEAK"), candidate(2, "SOFT")],
        screened_out: Vec::new(),
        exclusions: Vec::new(),
    };
    let manager = LifecycleManager::default();
    let mut store = PositionStore::new();
    open(&mut store, "WEAK");

    let report = open_entries(&cycle, &mut store, &manager, 250_000.0);
    assert_eq!(report.opened.len(), 1);
    assert_eq!(report.opened[0].0, "SOFT");
    assert_eq!(report.rejected, vec![("WEAK".to_string(), "position already open".to_string())]);
    assert_eq!(store.open_count(), 2);

    let table = MarkdownReport.positions(&store);
    assert!(table.contains("WEAK") && table.contains("SOFT"));
}
