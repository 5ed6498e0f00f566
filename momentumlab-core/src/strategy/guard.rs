//! Volatility-overpayment guard.
//!
//! Buying puts is only allowed when volatility is not rich: either IV Rank
//! is at or below its ceiling, or implied volatility is at or below a
//! multiple of 30-day realized volatility.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityInputs {
    pub implied_vol: f64,
    /// 0–100; `None` when the IV history is unavailable.
    pub iv_rank: Option<f64>,
    pub realized_vol_30d: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolatilityGuard {
    pub max_iv_rank: f64,
    pub realized_vol_multiple: f64,
}

impl Default for VolatilityGuard {
    fn default() -> Self {
        Self {
            max_iv_rank: 60.0,
            realized_vol_multiple: 1.1,
        }
    }
}

impl VolatilityGuard {
    pub fn iv_rank_ok(&self, v: &VolatilityInputs) -> bool {
        v.iv_rank.is_some_and(|rank| rank <= self.max_iv_rank)
    }

    pub fn iv_vs_realized_ok(&self, v: &VolatilityInputs) -> bool {
        v.implied_vol <= v.realized_vol_30d * self.realized_vol_multiple
    }

    pub fn passes(&self, v: &VolatilityInputs) -> bool {
        self.iv_rank_ok(v) || self.iv_vs_realized_ok(v)
    }
}
