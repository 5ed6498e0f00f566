//! Option structures that express a bearish signal with bounded risk.
//!
//! The structure (single put or put spread) is chosen once at construction
//! and never changes; risk metrics are computed at the same time and are
//! read-only afterwards.

pub mod builder;
pub mod expiry;
pub mod guard;

pub use builder::{BuildOutcome, RejectReason, StrategyBuilder, StrategyParams, StructurePreference, UnderlyingSnapshot};
pub use expiry::{monthly_expiries, select_expiry, third_friday};
pub use guard::{VolatilityGuard, VolatilityInputs};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::pricing::{price, OptionKind, OptionQuote, PricingInput};

/// Shares per listed equity option contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// One option contract in a structure, priced at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    pub expiry: NaiveDate,
    pub quote: OptionQuote,
}

impl OptionLeg {
    pub fn strike(&self) -> f64 {
        self.quote.input.strike
    }

    pub fn delta(&self) -> f64 {
        self.quote.greeks.delta
    }

    pub fn premium(&self) -> f64 {
        self.quote.price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Structure {
    SinglePut { long_leg: OptionLeg },
    /// Long the higher strike, short the lower strike.
    PutSpread { long_leg: OptionLeg, short_leg: OptionLeg },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaxProfit {
    /// Per structure, in dollars.
    Bounded(f64),
    /// A long put's payoff grows until the underlying reaches zero.
    Unbounded,
}

impl MaxProfit {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Bounded(v) => Some(*v),
            Self::Unbounded => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    /// Premium paid per share.
    pub net_debit: f64,
    /// Dollars per structure.
    pub max_profit: MaxProfit,
    /// Dollars per structure.
    pub max_loss: f64,
    /// Underlying price at expiry where the structure breaks even.
    pub breakeven: f64,
    /// max_profit / max_loss; `None` when profit is unbounded.
    pub risk_reward: Option<f64>,
}

/// Market inputs used to revalue an open structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkInputs {
    pub spot: f64,
    pub as_of: NaiveDate,
    pub volatility: f64,
    pub risk_free_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionStrategy {
    ticker: String,
    structure: Structure,
    metrics: StrategyMetrics,
    multiplier: f64,
}

impl OptionStrategy {
    pub fn single_put(ticker: impl Into<String>, long_leg: OptionLeg, multiplier: f64) -> EngineResult<Self> {
        ensure_put(&long_leg, "long")?;
        Self::assemble(ticker.into(), Structure::SinglePut { long_leg }, multiplier)
    }

    /// Fails with `InvalidStructure` unless the long strike is strictly above
    /// the short strike and the long delta is strictly more negative.
    pub fn put_spread(
        ticker: impl Into<String>,
        long_leg: OptionLeg,
        short_leg: OptionLeg,
        multiplier: f64,
    ) -> EngineResult<Self> {
        ensure_put(&long_leg, "long")?;
        ensure_put(&short_leg, "short")?;
        if long_leg.strike() <= short_leg.strike() {
            return Err(EngineError::InvalidStructure(format!(
                "crossed spread: long strike {:.2} must be above short strike {:.2}",
                long_leg.strike(),
                short_leg.strike()
            )));
        }
        if long_leg.delta() >= short_leg.delta() {
            return Err(EngineError::InvalidStructure(format!(
                "long delta {:.4} must be more negative than short delta {:.4}",
                long_leg.delta(),
                short_leg.delta()
            )));
        }
        if long_leg.expiry != short_leg.expiry {
            return Err(EngineError::InvalidStructure("legs must share an expiry".into()));
        }
        Self::assemble(ticker.into(), Structure::PutSpread { long_leg, short_leg }, multiplier)
    }

    fn assemble(ticker: String, structure: Structure, multiplier: f64) -> EngineResult<Self> {
        let metrics = compute_metrics(&structure, multiplier)?;
        Ok(Self {
            ticker,
            structure,
            metrics,
            multiplier,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn metrics(&self) -> &StrategyMetrics {
        &self.metrics
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn long_leg(&self) -> &OptionLeg {
        match &self.structure {
            Structure::SinglePut { long_leg } | Structure::PutSpread { long_leg, .. } => long_leg,
        }
    }

    pub fn short_leg(&self) -> Option<&OptionLeg> {
        match &self.structure {
            Structure::SinglePut { .. } => None,
            Structure::PutSpread { short_leg, .. } => Some(short_leg),
        }
    }

    pub fn is_spread(&self) -> bool {
        matches!(self.structure, Structure::PutSpread { .. })
    }

    pub fn expiry(&self) -> NaiveDate {
        self.long_leg().expiry
    }

    pub fn strikes(&self) -> Vec<f64> {
        let mut strikes = vec![self.long_leg().strike()];
        if let Some(short) = self.short_leg() {
            strikes.push(short.strike());
        }
        strikes
    }

    /// Net delta of the structure (long minus short), per share.
    pub fn net_delta(&self) -> f64 {
        self.long_leg().delta() - self.short_leg().map_or(0.0, OptionLeg::delta)
    }

    /// Current value per share: long leg minus short leg, repriced at `inputs`.
    pub fn mark(&self, inputs: &MarkInputs) -> EngineResult<f64> {
        let dte = (self.expiry() - inputs.as_of).num_days();
        let reprice = |leg: &OptionLeg| -> EngineResult<f64> {
            let input = PricingInput::from_dte(
                inputs.spot,
                leg.strike(),
                dte,
                inputs.risk_free_rate,
                inputs.volatility,
                OptionKind::Put,
            );
            Ok(price(&input)?.price)
        };
        let long = reprice(self.long_leg())?;
        let short = match self.short_leg() {
            Some(leg) => reprice(leg)?,
            None => 0.0,
        };
        EngineError::ensure_finite("strategy mark", long - short)
    }

    /// Value per share if the structure expired with the underlying at `spot`.
    pub fn intrinsic_value(&self, spot: f64) -> f64 {
        let payoff = |leg: &OptionLeg| (leg.strike() - spot).max(0.0);
        payoff(self.long_leg()) - self.short_leg().map_or(0.0, payoff)
    }
}

fn ensure_put(leg: &OptionLeg, role: &str) -> EngineResult<()> {
    if leg.quote.input.kind != OptionKind::Put {
        return Err(EngineError::InvalidStructure(format!("{role} leg must be a put")));
    }
    Ok(())
}

fn compute_metrics(structure: &Structure, multiplier: f64) -> EngineResult<StrategyMetrics> {
    let (long_leg, short_leg) = match structure {
        Structure::SinglePut { long_leg } => (long_leg, None),
        Structure::PutSpread { long_leg, short_leg } => (long_leg, Some(short_leg)),
    };

    let net_debit = long_leg.premium() - short_leg.map_or(0.0, OptionLeg::premium);
    let net_debit = EngineError::ensure_finite("net_debit", net_debit)?;
    if net_debit <= 0.0 {
        return Err(EngineError::InvalidStructure(format!(
            "net debit must be positive, got {net_debit:.4}"
        )));
    }

    let max_loss = net_debit * multiplier;
    let max_profit = match short_leg {
        None => MaxProfit::Unbounded,
        Some(short) => MaxProfit::Bounded(((long_leg.strike() - short.strike()) - net_debit) * multiplier),
    };
    let risk_reward = max_profit.value().map(|p| p / max_loss);

    Ok(StrategyMetrics {
        net_debit,
        max_profit,
        max_loss,
        breakeven: long_leg.strike() - net_debit,
        risk_reward,
    })
}
