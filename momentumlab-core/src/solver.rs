//! Delta-targeted strike search.
//!
//! For fixed spot, time, rate and volatility, delta falls monotonically as
//! the strike rises (puts get more negative, calls get smaller), so a
//! bisection over a wide strike bracket converges. The search is checked
//! against the bracket first and capped in iterations; a target outside the
//! achievable range fails with `NotFound` rather than being clamped.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::pricing::{price, OptionKind, PricingInput};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrikeSolver {
    /// Maximum |delta - target| accepted.
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Bracket, as multiples of spot.
    pub lower_multiple: f64,
    pub upper_multiple: f64,
    /// Largest |delta| considered reachable; targets beyond it (or within
    /// `1 - delta_limit` of zero) are rejected up front.
    pub delta_limit: f64,
}

impl Default for StrikeSolver {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iterations: 200,
            lower_multiple: 0.3,
            upper_multiple: 3.0,
            delta_limit: 0.999,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrikeSolution {
    pub strike: f64,
    pub delta: f64,
    pub iterations: usize,
}

impl StrikeSolver {
    /// Find the strike whose delta is within tolerance of `target_delta`.
    ///
    /// `template.strike` is ignored; every other input is held fixed.
    pub fn solve(&self, template: &PricingInput, target_delta: f64) -> EngineResult<StrikeSolution> {
        let not_found = |reason: String| EngineError::NotFound {
            quantity: "strike",
            target: target_delta,
            reason,
        };

        let signed_ok = match template.kind {
            OptionKind::Put => target_delta < 0.0,
            OptionKind::Call => target_delta > 0.0,
        };
        let magnitude = target_delta.abs();
        if !signed_ok || magnitude > self.delta_limit || magnitude < 1.0 - self.delta_limit {
            return Err(not_found(format!(
                "delta outside the reachable range for a {} (|delta| within [{:.3}, {:.3}])",
                template.kind,
                1.0 - self.delta_limit,
                self.delta_limit
            )));
        }

        let delta_at = |strike: f64| -> EngineResult<f64> {
            Ok(price(&template.with_strike(strike))?.greeks.delta)
        };

        let mut lo = template.spot * self.lower_multiple;
        let mut hi = template.spot * self.upper_multiple;
        let delta_lo = delta_at(lo)?;
        let delta_hi = delta_at(hi)?;

        // delta_lo is the largest achievable delta, delta_hi the smallest.
        if (delta_lo - target_delta).abs() <= self.tolerance {
            return Ok(StrikeSolution { strike: lo, delta: delta_lo, iterations: 0 });
        }
        if (delta_hi - target_delta).abs() <= self.tolerance {
            return Ok(StrikeSolution { strike: hi, delta: delta_hi, iterations: 0 });
        }
        if target_delta <= delta_hi || target_delta >= delta_lo {
            return Err(not_found(format!(
                "achievable delta range is [{delta_hi:.4}, {delta_lo:.4}]"
            )));
        }

        for iteration in 1..=self.max_iterations {
            let mid = 0.5 * (lo + hi);
            let delta = delta_at(mid)?;
            if (delta - target_delta).abs() <= self.tolerance {
                return Ok(StrikeSolution { strike: mid, delta, iterations: iteration });
            }
            if delta > target_delta {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        Err(not_found(format!(
            "no convergence within {} iterations",
            self.max_iterations
        )))
    }
}
