use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::exits::{ExitParams, ExitPolicy, ExitTrigger, PositionObservation};
use super::sizing::SizingParams;
use super::{PendingPosition, Position, PositionState, PositionStore};
use crate::domain::PositionId;
use crate::error::{EngineError, EngineResult};

/// An exit notification produced by one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitEvent {
    pub position_id: PositionId,
    pub ticker: String,
    pub date: NaiveDate,
    pub trigger: ExitTrigger,
    /// State after the exit; `Open` for a partial take profit.
    pub state: PositionState,
    pub contracts_closed: u32,
    pub strategy_value: f64,
}

/// Opens and exits positions against an injected [`PositionStore`].
pub struct LifecycleManager {
    pub sizing: SizingParams,
    pub exits: ExitPolicy,
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new(SizingParams::default(), &ExitParams::default())
    }
}

impl LifecycleManager {
    pub fn new(sizing: SizingParams, exits: &ExitParams) -> Self {
        Self {
            sizing,
            exits: ExitPolicy::standard(exits),
        }
    }

    /// Sizes `pending` and moves it to OPEN in `store`.
    ///
    /// On error the pending position is discarded and the store is left
    /// unchanged.
    pub fn open(&self, store: &mut PositionStore, pending: PendingPosition, capital: f64) -> EngineResult<PositionId> {
        let strategy = pending.strategy();
        let sizing = self.sizing.size(
            capital,
            strategy.metrics().net_debit,
            strategy.multiplier(),
            store.committed_risk(),
        )?;

        let id = PositionId::derive(
            pending.ticker(),
            pending.entry_date(),
            &strategy.strikes(),
            store.next_sequence(),
        );
        let position = Position::open(id.clone(), pending, sizing.contracts)?;
        info!(
            position = %id,
            ticker = position.ticker(),
            contracts = sizing.contracts,
            risk = sizing.position_risk,
            "position opened"
        );
        store.insert(position);
        Ok(id)
    }

    /// One exit pass over every open position.
    ///
    /// Positions without an observation are left open. Fully closed
    /// positions move to the store's closed history.
    pub fn evaluate_exits(
        &self,
        store: &mut PositionStore,
        observations: &BTreeMap<PositionId, PositionObservation>,
        as_of: NaiveDate,
    ) -> Vec<ExitEvent> {
        let mut events = Vec::new();
        for id in store.open_ids() {
            let Some(obs) = observations.get(&id) else {
                warn!(position = %id, "no observation, position left open");
                continue;
            };
            let Some(position) = store.get_mut(&id) else {
                continue;
            };
            let Some(trigger) = self.exits.evaluate(position, obs) else {
                debug!(position = %id, value = ?obs.strategy_value, "no exit condition met");
                continue;
            };

            let value = match obs.strategy_value {
                Some(value) => value,
                None => {
                    let intrinsic = position.strategy().intrinsic_value(obs.spot);
                    warn!(position = %id, spot = obs.spot, intrinsic, "structure unvalued, closing at intrinsic");
                    intrinsic
                }
            };
            match apply(position, trigger.clone(), as_of, value) {
                Ok(contracts_closed) => {
                    let state = position.state();
                    info!(position = %id, ticker = position.ticker(), %trigger, %state, "exit");
                    events.push(ExitEvent {
                        position_id: id.clone(),
                        ticker: position.ticker().to_string(),
                        date: as_of,
                        trigger,
                        state,
                        contracts_closed,
                        strategy_value: value,
                    });
                    if state.is_terminal() {
                        store.archive(&id);
                    }
                }
                Err(e) => warn!(position = %id, error = %e, "exit not applied"),
            }
        }
        events
    }
}

fn apply(position: &mut Position, trigger: ExitTrigger, as_of: NaiveDate, value: f64) -> EngineResult<u32> {
    EngineError::ensure_finite("strategy value", value)?;
    position.apply_exit(trigger, as_of, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::position::tests::pending;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()
    }

    fn obs(value: f64, dte: i64) -> PositionObservation {
        PositionObservation {
            spot: 92.0,
            sma_50: Some(96.0),
            rsi_14: Some(42.0),
            momentum_score: Some(-0.18),
            days_to_expiry: dte,
            strategy_value: Some(value),
        }
    }

    #[test]
    fn open_sizes_and_registers() {
        let manager = LifecycleManager::default();
        let mut store = PositionStore::new();
        let id = manager.open(&mut store, pending(), 250_000.0).unwrap();
        let pos = store.get(&id).unwrap();
        assert_eq!(pos.state(), PositionState::Open);
        let expected = (1_250.0 / (pos.entry_net_debit() * 100.0)).floor() as u32;
        assert_eq!(pos.contract_count(), expected);
        assert!(expected >= 1);
    }

    #[test]
    fn cap_rejects_without_touching_store() {
        let manager = LifecycleManager::new(
            SizingParams {
                risk_per_trade_pct: 0.0075,
                monthly_risk_cap_pct: 0.01,
            },
            &ExitParams::default(),
        );
        let mut store = PositionStore::new();
        manager.open(&mut store, pending(), 250_000.0).unwrap();
        let before = store.clone();
        let err = manager.open(&mut store, pending(), 250_000.0).unwrap_err();
        assert_eq!(err.kind(), "risk_cap_exceeded");
        assert_eq!(store.open_count(), 1);
        assert_eq!(store.committed_risk(), before.committed_risk());
    }

    #[test]
    fn distinct_ids_for_same_ticker_and_day() {
        let manager = LifecycleManager::default();
        let mut store = PositionStore::new();
        let a = manager.open(&mut store, pending(), 250_000.0).unwrap();
        let b = manager.open(&mut store, pending(), 250_000.0).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.open_count(), 2);
    }

    #[test]
    fn exit_pass_closes_and_archives() {
        let manager = LifecycleManager::default();
        let mut store = PositionStore::new();
        let id = manager.open(&mut store, pending(), 250_000.0).unwrap();
        let observations = BTreeMap::from([(id.clone(), obs(2.0, 14))]);

        let events = manager.evaluate_exits(&mut store, &observations, as_of());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].state, PositionState::ClosedTimeStop);
        assert_eq!(store.open_count(), 0);
        assert_eq!(store.closed().len(), 1);

        // Closed positions are never revisited.
        let events = manager.evaluate_exits(&mut store, &observations, as_of());
        assert!(events.is_empty());
    }

    #[test]
    fn unvalued_position_still_hits_time_stop_at_intrinsic() {
        let manager = LifecycleManager::default();
        let mut store = PositionStore::new();
        let id = manager.open(&mut store, pending(), 250_000.0).unwrap();
        let intrinsic = store.get(&id).unwrap().strategy().intrinsic_value(92.0);
        let observations = BTreeMap::from([(
            id,
            PositionObservation {
                strategy_value: None,
                ..obs(0.0, 10)
            },
        )]);

        let events = manager.evaluate_exits(&mut store, &observations, as_of());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].state, PositionState::ClosedTimeStop);
        assert!((events[0].strategy_value - intrinsic).abs() < 1e-12);
        assert_eq!(store.open_count(), 0);
    }

    #[test]
    fn missing_observation_stays_open() {
        let manager = LifecycleManager::default();
        let mut store = PositionStore::new();
        manager.open(&mut store, pending(), 250_000.0).unwrap();
        let events = manager.evaluate_exits(&mut store, &BTreeMap::new(), as_of());
        assert!(events.is_empty());
        assert_eq!(store.open_count(), 1);
    }

    #[test]
    fn quiet_position_stays_open() {
        let manager = LifecycleManager::default();
        let mut store = PositionStore::new();
        let id = manager.open(&mut store, pending(), 250_000.0).unwrap();
        let debit = store.get(&id).unwrap().entry_net_debit();
        let observations = BTreeMap::from([(id, obs(debit, 30))]);
        assert!(manager.evaluate_exits(&mut store, &observations, as_of()).is_empty());
        assert_eq!(store.open_count(), 1);
    }

    #[test]
    fn non_finite_value_is_not_applied() {
        let manager = LifecycleManager::default();
        let mut store = PositionStore::new();
        let id = manager.open(&mut store, pending(), 250_000.0).unwrap();
        let observations = BTreeMap::from([(id, obs(f64::NAN, 10))]);
        assert!(manager.evaluate_exits(&mut store, &observations, as_of()).is_empty());
        assert_eq!(store.open_count(), 1);
    }
}
