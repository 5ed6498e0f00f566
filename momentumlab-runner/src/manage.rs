//! Bridges cycle output and the lifecycle manager.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use momentumlab_core::domain::PositionId;
use momentumlab_core::indicators::{latest, RealizedVol, Rsi, Sma};
use momentumlab_core::lifecycle::{
    ExitEvent, LifecycleManager, PendingPosition, Position, PositionObservation, PositionStore,
};
use momentumlab_core::momentum::short_momentum;
use momentumlab_core::strategy::MarkInputs;

use crate::config::EngineConfig;
use crate::cycle::ShortCycle;
use crate::data_loader::MarketSnapshot;

const RISK_SMA_PERIOD: usize = 50;
const RISK_RSI_PERIOD: usize = 14;

pub fn lifecycle_manager(config: &EngineConfig) -> LifecycleManager {
    LifecycleManager::new(config.sizing.clone(), &config.exits)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenReport {
    pub opened: Vec<(String, PositionId)>,
    /// `(ticker, reason)` for ENTER candidates that did not open.
    pub rejected: Vec<(String, String)>,
}

/// Opens a position for every ENTER candidate, in rank order.
///
/// A ticker that already has an open position is skipped; sizing failures
/// (zero contracts, risk cap) reject only that candidate.
pub fn open_entries(
    cycle: &ShortCycle,
    store: &mut PositionStore,
    manager: &LifecycleManager,
    capital: f64,
) -> OpenReport {
    let mut report = OpenReport::default();
    for candidate in cycle.entries() {
        let Some(strategy) = candidate.strategy.strategy() else {
            continue;
        };
        if store.has_open(&candidate.ticker) {
            report
                .rejected
                .push((candidate.ticker.clone(), "position already open".into()));
            continue;
        }
        let pending = PendingPosition::new(strategy.clone(), cycle.as_of);
        match manager.open(store, pending, capital) {
            Ok(id) => report.opened.push((candidate.ticker.clone(), id)),
            Err(e) => {
                warn!(ticker = %candidate.ticker, reason = %e, "entry not opened");
                report.rejected.push((candidate.ticker.clone(), e.to_string()));
            }
        }
    }
    report
}

/// Observation for one open position, or `None` when the snapshot has no
/// price for its underlying.
///
/// A structure that cannot be repriced still yields an observation without
/// a value, so the time stop and risk events keep applying.
pub fn observe(position: &Position, snapshot: &MarketSnapshot, config: &EngineConfig) -> Option<PositionObservation> {
    let ticker = position.ticker();
    let Some(series) = snapshot.series.get(ticker) else {
        warn!(position = %position.id(), ticker, "no price series for open position");
        return None;
    };
    let spot = series.last_close()?;
    let bars = series.bars();

    let realized = RealizedVol::new(config.pricing.realized_vol_window).latest_or(bars, f64::NAN);
    let volatility = snapshot
        .volatility
        .get(ticker)
        .map(|q| q.implied_vol)
        .into_iter()
        .chain([realized, config.pricing.fallback_volatility])
        .find(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(f64::NAN);

    let inputs = MarkInputs {
        spot,
        as_of: snapshot.as_of,
        volatility,
        risk_free_rate: snapshot.risk_free_rate,
    };
    let strategy_value = match position.strategy().mark(&inputs) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(position = %position.id(), ticker, reason = %e, "cannot mark position");
            None
        }
    };

    Some(PositionObservation {
        spot,
        sma_50: latest(&Sma::new(RISK_SMA_PERIOD), bars),
        rsi_14: latest(&Rsi::new(RISK_RSI_PERIOD), bars),
        momentum_score: short_momentum(series).ok().map(|r| r.score),
        days_to_expiry: position.days_to_expiry(snapshot.as_of),
        strategy_value,
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitPass {
    pub events: Vec<ExitEvent>,
    /// Open positions with no price in the snapshot; they stay open.
    pub unobserved: Vec<PositionId>,
    /// Current value per share of every position that could be repriced.
    pub marks: BTreeMap<PositionId, f64>,
}

pub fn run_exit_pass(
    snapshot: &MarketSnapshot,
    store: &mut PositionStore,
    manager: &LifecycleManager,
    config: &EngineConfig,
) -> ExitPass {
    let mut observations = BTreeMap::new();
    let mut unobserved = Vec::new();
    for position in store.open_positions() {
        match observe(position, snapshot, config) {
            Some(obs) => {
                observations.insert(position.id().clone(), obs);
            }
            None => unobserved.push(position.id().clone()),
        }
    }
    let marks = observations
        .iter()
        .filter_map(|(id, obs)| obs.strategy_value.map(|v| (id.clone(), v)))
        .collect();

    let events = manager.evaluate_exits(store, &observations, snapshot.as_of);
    info!(
        observed = observations.len(),
        unobserved = unobserved.len(),
        exits = events.len(),
        "exit pass complete"
    );
    ExitPass {
        events,
        unobserved,
        marks,
    }
}
