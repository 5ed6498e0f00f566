//! Exit rules for open positions.
//!
//! Rules run in priority order and the first match wins: risk event, time
//! stop, take profit, stop loss. A position matching none stays open.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Position, PositionState};

/// Point-in-time facts about an open position's underlying and structure.
///
/// Indicators that could not be computed are `None` and never trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionObservation {
    pub spot: f64,
    pub sma_50: Option<f64>,
    pub rsi_14: Option<f64>,
    pub momentum_score: Option<f64>,
    pub days_to_expiry: i64,
    /// Current structure value per share; `None` when the structure could
    /// not be valued, in which case the value-based rules never fire.
    pub strategy_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCause {
    PriceAboveSma50,
    RsiAboveLimit,
    MomentumTurnedPositive,
}

impl fmt::Display for RiskCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriceAboveSma50 => write!(f, "price above SMA50"),
            Self::RsiAboveLimit => write!(f, "RSI above limit"),
            Self::MomentumTurnedPositive => write!(f, "momentum turned positive"),
        }
    }
}

/// Why a position was (fully or partly) closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum ExitTrigger {
    RiskEvent { causes: Vec<RiskCause> },
    TimeStop { days_to_expiry: i64 },
    /// `fraction` of the contracts to close; 1.0 closes the position.
    TakeProfit { value: f64, threshold: f64, fraction: f64 },
    StopLoss { value: f64, threshold: f64 },
}

impl ExitTrigger {
    /// Terminal state reached when this trigger closes the whole position.
    pub fn closing_state(&self) -> PositionState {
        match self {
            Self::RiskEvent { .. } => PositionState::ClosedRiskEvent,
            Self::TimeStop { .. } => PositionState::ClosedTimeStop,
            Self::TakeProfit { .. } => PositionState::ClosedTakeProfit,
            Self::StopLoss { .. } => PositionState::ClosedStopLoss,
        }
    }

    pub fn fraction(&self) -> f64 {
        match self {
            Self::TakeProfit { fraction, .. } => *fraction,
            _ => 1.0,
        }
    }
}

impl fmt::Display for ExitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RiskEvent { causes } => {
                let causes: Vec<String> = causes.iter().map(ToString::to_string).collect();
                write!(f, "risk event ({})", causes.join(", "))
            }
            Self::TimeStop { days_to_expiry } => write!(f, "time stop ({days_to_expiry} days to expiry)"),
            Self::TakeProfit {
                value,
                threshold,
                fraction,
            } => write!(f, "take profit ({value:.2} >= {threshold:.2}, closing {:.0}%)", fraction * 100.0),
            Self::StopLoss { value, threshold } => write!(f, "stop loss ({value:.2} <= {threshold:.2})"),
        }
    }
}

pub trait ExitRule: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, position: &Position, obs: &PositionObservation) -> Option<ExitTrigger>;
}

/// Protective exit: the bearish thesis is broken.
#[derive(Debug, Clone)]
pub struct RiskEventExit {
    pub rsi_limit: f64,
}

impl ExitRule for RiskEventExit {
    fn name(&self) -> &str {
        "risk_event"
    }

    fn evaluate(&self, _position: &Position, obs: &PositionObservation) -> Option<ExitTrigger> {
        let mut causes = Vec::new();
        if obs.sma_50.is_some_and(|sma| obs.spot > sma) {
            causes.push(RiskCause::PriceAboveSma50);
        }
        if obs.rsi_14.is_some_and(|rsi| rsi > self.rsi_limit) {
            causes.push(RiskCause::RsiAboveLimit);
        }
        if obs.momentum_score.is_some_and(|m| m > 0.0) {
            causes.push(RiskCause::MomentumTurnedPositive);
        }
        (!causes.is_empty()).then_some(ExitTrigger::RiskEvent { causes })
    }
}

/// Inclusive: fires at exactly `min_days_to_expiry`.
#[derive(Debug, Clone)]
pub struct TimeStopExit {
    pub min_days_to_expiry: i64,
}

impl ExitRule for TimeStopExit {
    fn name(&self) -> &str {
        "time_stop"
    }

    fn evaluate(&self, _position: &Position, obs: &PositionObservation) -> Option<ExitTrigger> {
        (obs.days_to_expiry <= self.min_days_to_expiry).then_some(ExitTrigger::TimeStop {
            days_to_expiry: obs.days_to_expiry,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TakeProfitMode {
    Full,
    /// Close `fraction` of the contracts on the first hit and the rest on
    /// the next.
    Partial { fraction: f64 },
}

#[derive(Debug, Clone)]
pub struct TakeProfitExit {
    pub multiple: f64,
    pub mode: TakeProfitMode,
}

impl ExitRule for TakeProfitExit {
    fn name(&self) -> &str {
        "take_profit"
    }

    fn evaluate(&self, position: &Position, obs: &PositionObservation) -> Option<ExitTrigger> {
        let value = obs.strategy_value?;
        let threshold = position.entry_net_debit() * self.multiple;
        if value < threshold {
            return None;
        }
        let fraction = match self.mode {
            TakeProfitMode::Partial { fraction } if position.partial_exits().is_empty() => fraction,
            _ => 1.0,
        };
        Some(ExitTrigger::TakeProfit {
            value,
            threshold,
            fraction,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StopLossExit {
    pub multiple: f64,
}

impl ExitRule for StopLossExit {
    fn name(&self) -> &str {
        "stop_loss"
    }

    fn evaluate(&self, position: &Position, obs: &PositionObservation) -> Option<ExitTrigger> {
        let value = obs.strategy_value?;
        let threshold = position.entry_net_debit() * self.multiple;
        (value <= threshold).then_some(ExitTrigger::StopLoss { value, threshold })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitParams {
    pub risk_event_rsi: f64,
    pub time_stop_days: i64,
    /// Between 1.70 and 2.00 in practice.
    pub take_profit_multiple: f64,
    pub take_profit_mode: TakeProfitMode,
    pub stop_loss_multiple: f64,
}

impl Default for ExitParams {
    fn default() -> Self {
        Self {
            risk_event_rsi: 60.0,
            time_stop_days: 14,
            take_profit_multiple: 1.80,
            take_profit_mode: TakeProfitMode::Full,
            stop_loss_multiple: 0.50,
        }
    }
}

/// Ordered rule list.
pub struct ExitPolicy {
    rules: Vec<Box<dyn ExitRule>>,
}

impl ExitPolicy {
    pub fn new(rules: Vec<Box<dyn ExitRule>>) -> Self {
        Self { rules }
    }

    pub fn standard(params: &ExitParams) -> Self {
        Self::new(vec![
            Box::new(RiskEventExit {
                rsi_limit: params.risk_event_rsi,
            }),
            Box::new(TimeStopExit {
                min_days_to_expiry: params.time_stop_days,
            }),
            Box::new(TakeProfitExit {
                multiple: params.take_profit_multiple,
                mode: params.take_profit_mode,
            }),
            Box::new(StopLossExit {
                multiple: params.stop_loss_multiple,
            }),
        ])
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn evaluate(&self, position: &Position, obs: &PositionObservation) -> Option<ExitTrigger> {
        self.rules.iter().find_map(|rule| rule.evaluate(position, obs))
    }
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self::standard(&ExitParams::default())
    }
}
