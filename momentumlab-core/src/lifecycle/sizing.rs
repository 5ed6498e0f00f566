//! Contract sizing under a per-trade risk budget and an aggregate cap.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingParams {
    /// Fraction of capital risked per position (0.005–0.0075 in practice).
    pub risk_per_trade_pct: f64,
    /// Cap on aggregate risk across all open positions.
    pub monthly_risk_cap_pct: f64,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: 0.005,
            monthly_risk_cap_pct: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingDecision {
    pub contracts: u32,
    pub risk_budget: f64,
    pub cost_per_contract: f64,
    /// Capital at risk for the sized position.
    pub position_risk: f64,
}

impl SizingParams {
    pub fn risk_budget(&self, capital: f64) -> f64 {
        capital * self.risk_per_trade_pct
    }

    pub fn risk_cap(&self, capital: f64) -> f64 {
        capital * self.monthly_risk_cap_pct
    }

    /// `floor(capital · pct / (net_debit · multiplier))`, checked against
    /// the aggregate cap given the risk already `committed` by open positions.
    pub fn size(&self, capital: f64, net_debit: f64, multiplier: f64, committed: f64) -> EngineResult<SizingDecision> {
        if !(capital.is_finite() && capital > 0.0) {
            return Err(EngineError::domain("sizing", format!("capital must be positive, got {capital}")));
        }
        if !(net_debit.is_finite() && net_debit > 0.0) {
            return Err(EngineError::domain("sizing", format!("net debit must be positive, got {net_debit}")));
        }
        let risk_budget = self.risk_budget(capital);
        let cost_per_contract = net_debit * multiplier;
        let contracts = (risk_budget / cost_per_contract).floor();
        if contracts < 1.0 {
            return Err(EngineError::ZeroContracts {
                risk_budget,
                cost_per_contract,
            });
        }
        // Saturates for absurd capital; the cap check below still applies.
        let contracts = contracts.min(f64::from(u32::MAX)) as u32;
        let position_risk = f64::from(contracts) * cost_per_contract;

        let cap = self.risk_cap(capital);
        if committed + position_risk > cap {
            return Err(EngineError::RiskCapExceeded {
                committed,
                requested: position_risk,
                cap,
            });
        }

        Ok(SizingDecision {
            contracts,
            risk_budget,
            cost_per_contract,
            position_risk,
        })
    }
}
