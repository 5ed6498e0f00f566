use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::exits::ExitTrigger;
use super::PositionState;
use crate::domain::PositionId;
use crate::error::{EngineError, EngineResult};
use crate::strategy::OptionStrategy;

/// A constructed strategy that passed entry and awaits sizing.
///
/// Never persisted: it either becomes an open [`Position`] in the same cycle
/// or is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPosition {
    strategy: OptionStrategy,
    entry_date: NaiveDate,
}

impl PendingPosition {
    pub fn new(strategy: OptionStrategy, entry_date: NaiveDate) -> Self {
        Self { strategy, entry_date }
    }

    pub fn ticker(&self) -> &str {
        self.strategy.ticker()
    }

    pub fn strategy(&self) -> &OptionStrategy {
        &self.strategy
    }

    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitRecord {
    pub date: NaiveDate,
    pub state: PositionState,
    pub trigger: ExitTrigger,
    /// Structure value per share at exit.
    pub strategy_value: f64,
    /// Dollars, on the contracts closed by this exit.
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialExit {
    pub date: NaiveDate,
    pub contracts: u32,
    pub strategy_value: f64,
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    id: PositionId,
    ticker: String,
    strategy: OptionStrategy,
    entry_date: NaiveDate,
    expiry_date: NaiveDate,
    entry_net_debit: f64,
    contract_count: u32,
    state: PositionState,
    exit: Option<ExitRecord>,
    #[serde(default)]
    partial_exits: Vec<PartialExit>,
}

impl Position {
    /// PENDING → OPEN with the sized contract count.
    pub(crate) fn open(id: PositionId, pending: PendingPosition, contract_count: u32) -> EngineResult<Self> {
        let PendingPosition { strategy, entry_date } = pending;
        let mut position = Self {
            id,
            ticker: strategy.ticker().to_string(),
            expiry_date: strategy.expiry(),
            entry_net_debit: strategy.metrics().net_debit,
            strategy,
            entry_date,
            contract_count,
            state: PositionState::Pending,
            exit: None,
            partial_exits: Vec::new(),
        };
        position.transition(PositionState::Open)?;
        Ok(position)
    }

    fn transition(&mut self, next: PositionState) -> EngineResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn id(&self) -> &PositionId {
        &self.id
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn strategy(&self) -> &OptionStrategy {
        &self.strategy
    }

    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    pub fn expiry_date(&self) -> NaiveDate {
        self.expiry_date
    }

    pub fn entry_net_debit(&self) -> f64 {
        self.entry_net_debit
    }

    /// Contracts still held.
    pub fn contract_count(&self) -> u32 {
        self.contract_count
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    pub fn exit(&self) -> Option<&ExitRecord> {
        self.exit.as_ref()
    }

    pub fn partial_exits(&self) -> &[PartialExit] {
        &self.partial_exits
    }

    pub fn days_to_expiry(&self, as_of: NaiveDate) -> i64 {
        (self.expiry_date - as_of).num_days()
    }

    /// Capital at risk on the contracts still held; zero once closed.
    pub fn committed_risk(&self) -> f64 {
        if self.is_open() {
            self.entry_net_debit * self.strategy.multiplier() * f64::from(self.contract_count)
        } else {
            0.0
        }
    }

    fn pnl(&self, strategy_value: f64, contracts: u32) -> f64 {
        (strategy_value - self.entry_net_debit) * self.strategy.multiplier() * f64::from(contracts)
    }

    pub fn unrealized_pnl(&self, strategy_value: f64) -> f64 {
        if self.is_open() {
            self.pnl(strategy_value, self.contract_count)
        } else {
            0.0
        }
    }

    pub fn realized_pnl(&self) -> f64 {
        let partial: f64 = self.partial_exits.iter().map(|p| p.realized_pnl).sum();
        partial + self.exit.as_ref().map_or(0.0, |e| e.realized_pnl)
    }

    /// Applies `trigger`. A fractional take profit that leaves contracts
    /// behind records a partial exit and keeps the position open; anything
    /// else closes it. Returns the number of contracts closed.
    pub(crate) fn apply_exit(&mut self, trigger: ExitTrigger, date: NaiveDate, strategy_value: f64) -> EngineResult<u32> {
        let fraction = trigger.fraction();
        if fraction < 1.0 {
            let contracts = ((f64::from(self.contract_count) * fraction).floor() as u32).max(1);
            if contracts < self.contract_count {
                let realized_pnl = self.pnl(strategy_value, contracts);
                self.partial_exits.push(PartialExit {
                    date,
                    contracts,
                    strategy_value,
                    realized_pnl,
                });
                self.contract_count -= contracts;
                return Ok(contracts);
            }
        }

        let state = trigger.closing_state();
        self.transition(state)?;
        let closed = self.contract_count;
        self.exit = Some(ExitRecord {
            date,
            state,
            realized_pnl: self.pnl(strategy_value, closed),
            trigger,
            strategy_value,
        });
        Ok(closed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::strategy::tests::leg;
    use crate::strategy::CONTRACT_MULTIPLIER;

    pub(crate) fn pending() -> PendingPosition {
        let strategy = OptionStrategy::put_spread("XYZ", leg(95.0), leg(85.0), CONTRACT_MULTIPLIER).unwrap();
        PendingPosition::new(strategy, NaiveDate::from_ymd_opt(2024, 6, 4).unwrap())
    }

    /// Open position with 4 contracts and the given entry debit.
    pub(crate) fn open_position(debit: f64) -> Position {
        let mut p = Position::open(PositionId("test".into()), pending(), 4).unwrap();
        p.entry_net_debit = debit;
        p
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
    }

    #[test]
    fn opening_moves_pending_to_open() {
        let p = Position::open(PositionId("a".into()), pending(), 3).unwrap();
        assert_eq!(p.state(), PositionState::Open);
        assert_eq!(p.expiry_date(), NaiveDate::from_ymd_opt(2024, 7, 19).unwrap());
        let expected = p.entry_net_debit() * 100.0 * 3.0;
        assert!((p.committed_risk() - expected).abs() < 1e-9);
    }

    #[test]
    fn full_exit_is_terminal() {
        let mut p = open_position(2.0);
        let closed = p
            .apply_exit(ExitTrigger::TimeStop { days_to_expiry: 14 }, date(), 1.5)
            .unwrap();
        assert_eq!(closed, 4);
        assert_eq!(p.state(), PositionState::ClosedTimeStop);
        assert_eq!(p.committed_risk(), 0.0);
        assert!((p.realized_pnl() - (-0.5 * 100.0 * 4.0)).abs() < 1e-9);

        let again = p.apply_exit(ExitTrigger::TimeStop { days_to_expiry: 13 }, date(), 1.0);
        assert!(matches!(again, Err(EngineError::InvalidTransition { .. })));
    }

    #[test]
    fn partial_take_profit_keeps_position_open() {
        let mut p = open_position(2.0);
        let trigger = ExitTrigger::TakeProfit {
            value: 4.0,
            threshold: 3.6,
            fraction: 0.5,
        };
        assert_eq!(p.apply_exit(trigger, date(), 4.0).unwrap(), 2);
        assert!(p.is_open());
        assert_eq!(p.contract_count(), 2);
        assert_eq!(p.partial_exits().len(), 1);
        assert!((p.realized_pnl() - 2.0 * 100.0 * 2.0).abs() < 1e-9);
    }

    #[test]
    fn partial_on_single_contract_closes_fully() {
        let mut p = open_position(2.0);
        p.contract_count = 1;
        let trigger = ExitTrigger::TakeProfit {
            value: 4.0,
            threshold: 3.6,
            fraction: 0.5,
        };
        assert_eq!(p.apply_exit(trigger, date(), 4.0).unwrap(), 1);
        assert_eq!(p.state(), PositionState::ClosedTakeProfit);
    }

    #[test]
    fn serde_roundtrip_preserves_state() {
        let p = open_position(2.0);
        let json = serde_json::to_string(&p).unwrap();
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), p.id());
        assert_eq!(back.state(), PositionState::Open);
        assert_eq!(back.contract_count(), 4);
        assert_eq!(back.strategy().strikes(), vec![95.0, 85.0]);
        assert!((back.entry_net_debit() - 2.0).abs() < 1e-12);
    }
}
