//! Strategy construction: volatility guard, maturity, delta-targeted legs,
//! structure choice.
//!
//! Every expected failure comes back as `BuildOutcome::Rejected` with a reason.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::{
    monthly_expiries, select_expiry, OptionLeg, OptionStrategy, VolatilityGuard, VolatilityInputs,
    CONTRACT_MULTIPLIER,
};
use crate::error::EngineResult;
use crate::pricing::{price, OptionKind, PricingInput};
use crate::solver::StrikeSolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructurePreference {
    /// Spread when the legs are at least `min_spread_width_pct` of spot apart.
    Auto,
    SinglePut,
    PutSpread,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub long_delta_target: f64,
    /// Most negative delta accepted for the long leg.
    pub long_delta_min: f64,
    /// Least negative delta accepted for the long leg.
    pub long_delta_max: f64,
    pub short_delta_target: f64,
    pub min_dte: i64,
    pub max_dte: i64,
    pub structure: StructurePreference,
    pub min_spread_width_pct: f64,
    pub multiplier: f64,
    /// Strikes are rounded to this increment before final pricing.
    pub strike_increment: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            long_delta_target: -0.30,
            long_delta_min: -0.40,
            long_delta_max: -0.25,
            short_delta_target: -0.10,
            min_dte: 30,
            max_dte: 60,
            structure: StructurePreference::Auto,
            min_spread_width_pct: 0.05,
            multiplier: CONTRACT_MULTIPLIER,
            strike_increment: 0.01,
        }
    }
}

/// Priced underlying for one ticker at one as-of date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlyingSnapshot {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub spot: f64,
    pub risk_free_rate: f64,
    pub volatility: VolatilityInputs,
    /// Listed expiries; empty means the standard monthly calendar.
    #[serde(default)]
    pub expiries: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    VolatilityTooRich {
        implied_vol: f64,
        iv_rank: Option<f64>,
        realized_vol_30d: f64,
    },
    NoExpiryInBand { min_dte: i64, max_dte: i64 },
    StrikeNotFound { leg: String, detail: String },
    LongDeltaOutOfBand { delta: f64 },
    CrossedSpread { detail: String },
    InvalidPricing { detail: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VolatilityTooRich {
                implied_vol,
                iv_rank,
                realized_vol_30d,
            } => {
                let rank = iv_rank.map_or("n/a".to_string(), |r| format!("{r:.0}"));
                write!(f, "volatility too rich (IV {implied_vol:.3}, IV rank {rank}, RV30 {realized_vol_30d:.3})")
            }
            Self::NoExpiryInBand { min_dte, max_dte } => {
                write!(f, "no expiry between {min_dte} and {max_dte} DTE")
            }
            Self::StrikeNotFound { leg, detail } => write!(f, "{leg} strike not found: {detail}"),
            Self::LongDeltaOutOfBand { delta } => write!(f, "long leg delta {delta:.3} outside band"),
            Self::CrossedSpread { detail } => write!(f, "crossed spread: {detail}"),
            Self::InvalidPricing { detail } => write!(f, "invalid pricing: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildOutcome {
    Built { strategy: OptionStrategy },
    Rejected { reason: RejectReason },
}

impl BuildOutcome {
    pub fn strategy(&self) -> Option<&OptionStrategy> {
        match self {
            Self::Built { strategy } => Some(strategy),
            Self::Rejected { .. } => None,
        }
    }

    fn reject(reason: RejectReason) -> Self {
        Self::Rejected { reason }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrategyBuilder {
    pub params: StrategyParams,
    pub guard: VolatilityGuard,
    pub solver: StrikeSolver,
}

impl StrategyBuilder {
    pub fn new(params: StrategyParams, guard: VolatilityGuard, solver: StrikeSolver) -> Self {
        Self { params, guard, solver }
    }

    pub fn build(&self, u: &UnderlyingSnapshot) -> BuildOutcome {
        let p = &self.params;

        if !self.guard.passes(&u.volatility) {
            return BuildOutcome::reject(RejectReason::VolatilityTooRich {
                implied_vol: u.volatility.implied_vol,
                iv_rank: u.volatility.iv_rank,
                realized_vol_30d: u.volatility.realized_vol_30d,
            });
        }

        let listed = !u.expiries.is_empty();
        let expiries = if listed {
            u.expiries.clone()
        } else {
            monthly_expiries(u.as_of, 4)
        };
        let dtes: Vec<i64> = expiries.iter().map(|e| (*e - u.as_of).num_days()).collect();
        let dte = match select_expiry(&dtes, p.min_dte, p.max_dte) {
            Some(dte) => dte,
            // The monthly calendar leaves days with no third Friday in the
            // band; price those at the band floor instead.
            None if !listed && p.min_dte <= p.max_dte => {
                debug!(ticker = %u.ticker, as_of = %u.as_of, dte = p.min_dte, "no monthly expiry in band, using target DTE");
                p.min_dte
            }
            None => {
                return BuildOutcome::reject(RejectReason::NoExpiryInBand {
                    min_dte: p.min_dte,
                    max_dte: p.max_dte,
                })
            }
        };
        let expiry = u.as_of + chrono::Duration::days(dte);

        let template = PricingInput::from_dte(
            u.spot,
            u.spot,
            dte,
            u.risk_free_rate,
            u.volatility.implied_vol,
            OptionKind::Put,
        );

        let long_leg = match self.solve_leg(&template, p.long_delta_target, expiry) {
            Ok(leg) => leg,
            Err(e) => {
                return BuildOutcome::reject(RejectReason::StrikeNotFound {
                    leg: "long".into(),
                    detail: e.to_string(),
                })
            }
        };
        if long_leg.delta() < p.long_delta_min || long_leg.delta() > p.long_delta_max {
            return BuildOutcome::reject(RejectReason::LongDeltaOutOfBand {
                delta: long_leg.delta(),
            });
        }

        let short_leg = match p.structure {
            StructurePreference::SinglePut => None,
            StructurePreference::PutSpread | StructurePreference::Auto => {
                match self.solve_leg(&template, p.short_delta_target, expiry) {
                    Ok(leg) => Some(leg),
                    Err(e) if p.structure == StructurePreference::PutSpread => {
                        return BuildOutcome::reject(RejectReason::StrikeNotFound {
                            leg: "short".into(),
                            detail: e.to_string(),
                        })
                    }
                    Err(e) => {
                        debug!(ticker = %u.ticker, reason = %e, "short leg unavailable, using single put");
                        None
                    }
                }
            }
        };

        if let Some(short) = &short_leg {
            if short.strike() >= long_leg.strike() {
                return BuildOutcome::reject(RejectReason::CrossedSpread {
                    detail: format!(
                        "short strike {:.2} is not below long strike {:.2}",
                        short.strike(),
                        long_leg.strike()
                    ),
                });
            }
        }

        let use_spread = match (p.structure, &short_leg) {
            (_, None) => false,
            (StructurePreference::PutSpread, Some(_)) => true,
            (_, Some(short)) => long_leg.strike() - short.strike() >= p.min_spread_width_pct * u.spot,
        };

        let built = match short_leg {
            Some(short) if use_spread => OptionStrategy::put_spread(&u.ticker, long_leg, short, p.multiplier),
            _ => OptionStrategy::single_put(&u.ticker, long_leg, p.multiplier),
        };

        match built {
            Ok(strategy) => BuildOutcome::Built { strategy },
            Err(e) => BuildOutcome::reject(RejectReason::InvalidPricing { detail: e.to_string() }),
        }
    }

    /// Solve, round the strike to the listing increment, and price the leg
    /// at the rounded strike.
    fn solve_leg(&self, template: &PricingInput, target: f64, expiry: NaiveDate) -> EngineResult<OptionLeg> {
        let solution = self.solver.solve(template, target)?;
        let strike = round_to_increment(solution.strike, self.params.strike_increment);
        let quote = price(&template.with_strike(strike))?;
        Ok(OptionLeg { expiry, quote })
    }
}

fn round_to_increment(value: f64, increment: f64) -> f64 {
    if increment > 0.0 {
        (value / increment).round() * increment
    } else {
        value
    }
}
