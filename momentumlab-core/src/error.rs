//! Engine error taxonomy.
//!
//! Every failure the engine can produce for a single ticker or position is a
//! variant here. Callers isolate these per ticker: one ticker's error never
//! aborts the evaluation of the rest of the universe.

use thiserror::Error;

use crate::lifecycle::PositionState;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Mathematically undefined input or a non-finite intermediate result.
    #[error("domain error in {context}: {detail}")]
    Domain { context: String, detail: String },

    #[error("insufficient history for '{ticker}': need {required} observations, have {available}")]
    InsufficientHistory {
        ticker: String,
        required: usize,
        available: usize,
    },

    /// A numeric search could not bracket or converge on its target.
    #[error("no {quantity} found for target {target}: {reason}")]
    NotFound {
        quantity: &'static str,
        target: f64,
        reason: String,
    },

    #[error("risk cap exceeded: committed {committed:.2} + requested {requested:.2} > cap {cap:.2}")]
    RiskCapExceeded {
        committed: f64,
        requested: f64,
        cap: f64,
    },

    #[error("risk budget {risk_budget:.2} cannot cover one contract costing {cost_per_contract:.2}")]
    ZeroContracts {
        risk_budget: f64,
        cost_per_contract: f64,
    },

    #[error("invalid position transition {from} -> {to}")]
    InvalidTransition {
        from: PositionState,
        to: PositionState,
    },

    #[error("invalid strategy structure: {0}")]
    InvalidStructure(String),

    #[error("invalid price series for '{ticker}': {detail}")]
    InvalidSeries { ticker: String, detail: String },

    #[error("unknown position '{0}'")]
    UnknownPosition(String),
}

impl EngineError {
    pub fn domain(context: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Domain {
            context: context.into(),
            detail: detail.into(),
        }
    }

    /// Reject NaN and infinities before they reach a sort or persisted state.
    pub fn ensure_finite(context: &str, value: f64) -> EngineResult<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::domain(context, format!("non-finite value {value}")))
        }
    }

    /// Short machine-friendly label, used for exclusion tallies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Domain { .. } => "domain",
            Self::InsufficientHistory { .. } => "insufficient_history",
            Self::NotFound { .. } => "not_found",
            Self::RiskCapExceeded { .. } => "risk_cap_exceeded",
            Self::ZeroContracts { .. } => "zero_contracts",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidStructure(_) => "invalid_structure",
            Self::InvalidSeries { .. } => "invalid_series",
            Self::UnknownPosition(_) => "unknown_position",
        }
    }
}
