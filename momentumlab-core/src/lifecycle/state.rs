use serde::{Deserialize, Serialize};
use std::fmt;

/// Position state machine.
///
/// `Pending → Open → Closed*`. Closed states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    Pending,
    Open,
    ClosedTakeProfit,
    ClosedStopLoss,
    ClosedTimeStop,
    ClosedRiskEvent,
}

impl PositionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Open)
    }

    pub fn can_transition_to(self, next: PositionState) -> bool {
        match self {
            Self::Pending => next == Self::Open,
            Self::Open => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Open => "OPEN",
            Self::ClosedTakeProfit => "CLOSED_TAKE_PROFIT",
            Self::ClosedStopLoss => "CLOSED_STOP_LOSS",
            Self::ClosedTimeStop => "CLOSED_TIME_STOP",
            Self::ClosedRiskEvent => "CLOSED_RISK_EVENT",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PositionState; 6] = [
        PositionState::Pending,
        PositionState::Open,
        PositionState::ClosedTakeProfit,
        PositionState::ClosedStopLoss,
        PositionState::ClosedTimeStop,
        PositionState::ClosedRiskEvent,
    ];

    #[test]
    fn terminal_states_are_final() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn pending_only_opens() {
        assert!(PositionState::Pending.can_transition_to(PositionState::Open));
        assert!(!PositionState::Pending.can_transition_to(PositionState::ClosedStopLoss));
        assert!(!PositionState::Open.can_transition_to(PositionState::Pending));
        assert!(!PositionState::Open.can_transition_to(PositionState::Open));
        assert!(PositionState::Open.can_transition_to(PositionState::ClosedRiskEvent));
    }

    #[test]
    fn serde_uses_screaming_case() {
        let json = serde_json::to_string(&PositionState::ClosedTimeStop).unwrap();
        assert_eq!(json, "\"CLOSED_TIME_STOP\"");
        assert_eq!(PositionState::ClosedTimeStop.to_string(), "CLOSED_TIME_STOP");
    }
}
