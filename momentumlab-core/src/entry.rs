//! Entry-condition scoring: ENTER, WAIT or REJECT.
//!
//! Hard conditions must all hold or the candidate is rejected for this
//! cycle. Soft conditions are weighted; a candidate that clears every hard
//! condition but scores below `min_soft_score` waits, and stays eligible next
//! cycle without recomputing its momentum signal.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::PriceSeries;
use crate::error::EngineResult;
use crate::indicators::{latest, Rsi};
use crate::strategy::{VolatilityGuard, VolatilityInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryDecision {
    Enter,
    Wait,
    Reject,
}

impl fmt::Display for EntryDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => write!(f, "ENTER"),
            Self::Wait => write!(f, "WAIT"),
            Self::Reject => write!(f, "REJECT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    pub name: String,
    pub passed: bool,
    /// The measured value, when there is one.
    pub value: Option<f64>,
}

/// Everything a condition may look at.
pub struct EntryContext<'a> {
    pub series: &'a PriceSeries,
    pub volatility: &'a VolatilityInputs,
}

pub trait EntryCondition: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, ctx: &EntryContext<'_>) -> ConditionResult;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryParams {
    pub rsi_period: usize,
    pub rsi_min: f64,
    pub rsi_max: f64,
    /// Largest tolerated upward gap versus the prior close, as a fraction.
    pub max_gap_up: f64,
    /// Largest tolerated retracement of the prior down-leg, as a fraction.
    pub max_pullback_retrace: f64,
    pub pullback_lookback: usize,
    pub pullback_weight: f64,
    pub min_soft_score: f64,
}

impl Default for EntryParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_min: 40.0,
            rsi_max: 55.0,
            max_gap_up: 0.03,
            max_pullback_retrace: 0.50,
            pullback_lookback: 20,
            pullback_weight: 1.0,
            min_soft_score: 0.5,
        }
    }
}

/// RSI must sit inside `[min, max]`; a missing RSI fails.
pub struct RsiBand {
    rsi: Rsi,
    min: f64,
    max: f64,
}

impl RsiBand {
    pub fn accepts(&self, rsi: f64) -> bool {
        rsi >= self.min && rsi <= self.max
    }
}

impl EntryCondition for RsiBand {
    fn name(&self) -> &str {
        "rsi_band"
    }

    fn check(&self, ctx: &EntryContext<'_>) -> ConditionResult {
        let value = latest(&self.rsi, ctx.series.bars());
        ConditionResult {
            name: self.name().into(),
            passed: value.is_some_and(|v| self.accepts(v)),
            value,
        }
    }
}

/// No upward gap above `max_gap` on the latest session.
///
/// Measured open-versus-prior-close when the open is known, otherwise
/// close-to-close.
pub struct NoGapUp {
    max_gap: f64,
}

impl EntryCondition for NoGapUp {
    fn name(&self) -> &str {
        "no_gap_up"
    }

    fn check(&self, ctx: &EntryContext<'_>) -> ConditionResult {
        let bars = ctx.series.bars();
        let value = match bars {
            [.., prev, last] => Some(last.open.unwrap_or(last.close) / prev.close - 1.0),
            _ => None,
        };
        ConditionResult {
            name: self.name().into(),
            passed: value.is_some_and(|g| g <= self.max_gap),
            value,
        }
    }
}

impl EntryCondition for VolatilityGuard {
    fn name(&self) -> &str {
        "volatility_guard"
    }

    fn check(&self, ctx: &EntryContext<'_>) -> ConditionResult {
        ConditionResult {
            name: self.name().into(),
            passed: self.passes(ctx.volatility),
            value: ctx.volatility.iv_rank,
        }
    }
}

/// The bounce off the latest swing low has retraced at most `max_retrace`
/// of the down-leg that produced it.
///
/// Within the lookback window the swing low is the lowest close and the
/// swing high is the highest close before it. No down-leg in the window
/// fails the condition.
pub struct PullbackDepth {
    lookback: usize,
    max_retrace: f64,
}

impl PullbackDepth {
    pub fn retracement(&self, closes: &[f64]) -> Option<f64> {
        let start = closes.len().saturating_sub(self.lookback);
        let window = &closes[start..];
        let (low_idx, &low) = window
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))?;
        let high = window[..=low_idx].iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let amplitude = high - low;
        if amplitude <= 0.0 {
            return None;
        }
        let last = *window.last()?;
        Some((last - low) / amplitude)
    }
}

impl EntryCondition for PullbackDepth {
    fn name(&self) -> &str {
        "pullback_depth"
    }

    fn check(&self, ctx: &EntryContext<'_>) -> ConditionResult {
        let value = self.retracement(&ctx.series.closes());
        ConditionResult {
            name: self.name().into(),
            passed: value.is_some_and(|r| r <= self.max_retrace),
            value,
        }
    }
}

/// Hard predicates plus weighted soft predicates.
pub struct EntryConditionSet {
    pub hard: Vec<Box<dyn EntryCondition>>,
    pub soft: Vec<(Box<dyn EntryCondition>, f64)>,
    pub min_soft_score: f64,
    /// Minimum bars before any condition is evaluated.
    pub required_history: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryEvaluation {
    pub decision: EntryDecision,
    pub hard: Vec<ConditionResult>,
    pub soft: Vec<ConditionResult>,
    /// Passed soft weight over total soft weight, 0–1.
    pub soft_score: f64,
}

impl EntryEvaluation {
    pub fn failed_hard(&self) -> impl Iterator<Item = &ConditionResult> {
        self.hard.iter().filter(|c| !c.passed)
    }
}

impl EntryConditionSet {
    pub fn standard(params: &EntryParams, guard: &VolatilityGuard) -> Self {
        Self {
            hard: vec![
                Box::new(RsiBand {
                    rsi: Rsi::new(params.rsi_period),
                    min: params.rsi_min,
                    max: params.rsi_max,
                }),
                Box::new(NoGapUp {
                    max_gap: params.max_gap_up,
                }),
                Box::new(guard.clone()),
            ],
            soft: vec![(
                Box::new(PullbackDepth {
                    lookback: params.pullback_lookback,
                    max_retrace: params.max_pullback_retrace,
                }),
                params.pullback_weight,
            )],
            min_soft_score: params.min_soft_score,
            required_history: params.rsi_period + 1,
        }
    }

    /// Fails with `InsufficientHistory` when the series is too short for the
    /// RSI; everything else is a classification.
    pub fn evaluate(&self, series: &PriceSeries, volatility: &VolatilityInputs) -> EngineResult<EntryEvaluation> {
        series.require(self.required_history)?;
        let ctx = EntryContext { series, volatility };

        let hard: Vec<ConditionResult> = self.hard.iter().map(|c| c.check(&ctx)).collect();
        let soft: Vec<ConditionResult> = self.soft.iter().map(|(c, _)| c.check(&ctx)).collect();

        let total: f64 = self.soft.iter().map(|(_, w)| w).sum();
        let earned: f64 = self
            .soft
            .iter()
            .zip(&soft)
            .filter(|(_, r)| r.passed)
            .map(|((_, w), _)| w)
            .sum();
        let soft_score = if total > 0.0 { earned / total } else { 1.0 };

        let decision = if hard.iter().any(|c| !c.passed) {
            EntryDecision::Reject
        } else if soft_score < self.min_soft_score {
            EntryDecision::Wait
        } else {
            EntryDecision::Enter
        };

        Ok(EntryEvaluation {
            decision,
            hard,
            soft,
            soft_score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceBar;
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn calm_vol() -> VolatilityInputs {
        VolatilityInputs {
            implied_vol: 0.30,
            iv_rank: Some(30.0),
            realized_vol_30d: 0.30,
        }
    }

    fn scorer() -> EntryConditionSet {
        EntryConditionSet::standard(&EntryParams::default(), &VolatilityGuard::default())
    }

    /// Decline then a bounce; `up` steps of +1 after `down` steps of -1,
    /// preceded by a flat stretch.
    fn down_then_up(down: usize, up: usize) -> PriceSeries {
        let mut closes = vec![100.0; 10];
        for _ in 0..down {
            closes.push(closes.last().unwrap() - 1.0);
        }
        for _ in 0..up {
            closes.push(closes.last().unwrap() + 1.0);
        }
        PriceSeries::from_closes("E", start(), &closes).unwrap()
    }

    #[test]
    fn rsi_above_band_rejects() {
        // Bounce strong enough to lift RSI above 55.
        let series = down_then_up(8, 10);
        let rsi = latest(&Rsi::new(14), series.bars()).unwrap();
        assert!(rsi > 55.0, "rsi {rsi}");
        let eval = scorer().evaluate(&series, &calm_vol()).unwrap();
        assert_eq!(eval.decision, EntryDecision::Reject);
        assert_eq!(eval.failed_hard().next().unwrap().name, "rsi_band");
    }

    #[test]
    fn rsi_band_edges() {
        let band = RsiBand {
            rsi: Rsi::new(14),
            min: 40.0,
            max: 55.0,
        };
        assert!(band.accepts(55.0));
        assert!(!band.accepts(56.0));
        assert!(band.accepts(40.0));
        assert!(!band.accepts(39.9));
        assert!(!band.accepts(f64::NAN));
    }

    #[test]
    fn gap_up_rejects() {
        let mut bars: Vec<PriceBar> = down_then_up(14, 6).bars().to_vec();
        let n = bars.len();
        let prev_close = bars[n - 2].close;
        bars[n - 1].open = Some(prev_close * 1.04);
        let series = PriceSeries::new("GAP", bars).unwrap();
        let eval = scorer().evaluate(&series, &calm_vol()).unwrap();
        let gap = eval.hard.iter().find(|c| c.name == "no_gap_up").unwrap();
        assert!(!gap.passed);
        assert_eq!(eval.decision, EntryDecision::Reject);
    }

    #[test]
    fn rich_vol_rejects() {
        let vol = VolatilityInputs {
            implied_vol: 0.60,
            iv_rank: Some(85.0),
            realized_vol_30d: 0.30,
        };
        let eval = scorer().evaluate(&down_then_up(14, 6), &vol).unwrap();
        assert_eq!(eval.decision, EntryDecision::Reject);
    }

    #[test]
    fn shallow_bounce_enters() {
        // 14 down, 6 up: retrace 6/13 inside the window and RSI near 45.
        let series = down_then_up(14, 6);
        let rsi = latest(&Rsi::new(14), series.bars()).unwrap();
        assert!((40.0..=55.0).contains(&rsi), "rsi {rsi}");
        let eval = scorer().evaluate(&series, &calm_vol()).unwrap();
        assert_eq!(eval.decision, EntryDecision::Enter, "{eval:?}");
        assert_eq!(eval.soft_score, 1.0);
    }

    #[test]
    fn deep_bounce_waits() {
        // Every hard condition holds but the retracement is too deep.
        let params = EntryParams {
            rsi_min: 0.0,
            rsi_max: 100.0,
            ..EntryParams::default()
        };
        let set = EntryConditionSet::standard(&params, &VolatilityGuard::default());
        let eval = set.evaluate(&down_then_up(8, 6), &calm_vol()).unwrap();
        assert_eq!(eval.decision, EntryDecision::Wait);
        assert_eq!(eval.soft_score, 0.0);
    }

    #[test]
    fn retracement_measure() {
        let p = PullbackDepth {
            lookback: 20,
            max_retrace: 0.5,
        };
        assert_eq!(p.retracement(&[110.0, 100.0, 90.0, 95.0]), Some(0.25));
        assert_eq!(p.retracement(&[90.0, 95.0, 100.0]), None);
    }

    #[test]
    fn short_history_is_insufficient() {
        let series = PriceSeries::from_closes("S", start(), &[100.0; 10]).unwrap();
        assert!(scorer().evaluate(&series, &calm_vol()).is_err());
    }
}
