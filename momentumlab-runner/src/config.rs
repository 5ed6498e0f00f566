//! Engine configuration loaded from TOML.
//!
//! Every section is optional; a missing section or key falls back to the
//! documented default of the core parameter struct it maps to.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use momentumlab_core::entry::EntryParams;
use momentumlab_core::lifecycle::{ExitParams, SizingParams, TakeProfitMode};
use momentumlab_core::momentum::ShortSignalParams;
use momentumlab_core::solver::StrikeSolver;
use momentumlab_core::strategy::{StrategyParams, VolatilityGuard};
use momentumlab_core::universe::{UniverseFilter, DEFAULT_UNIVERSE_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSection {
    /// Candidates kept after ranking.
    pub size: usize,
    pub long_filter: UniverseFilter,
    pub short_filter: UniverseFilter,
}

impl Default for UniverseSection {
    fn default() -> Self {
        Self {
            size: DEFAULT_UNIVERSE_SIZE,
            long_filter: UniverseFilter::long(),
            short_filter: UniverseFilter::short(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongSection {
    pub top_n: usize,
}

impl Default for LongSection {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortSection {
    pub top_n: usize,
    pub signal: ShortSignalParams,
}

impl Default for ShortSection {
    fn default() -> Self {
        Self {
            top_n: 5,
            signal: ShortSignalParams::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSection {
    /// Used when the snapshot carries no rate of its own.
    pub risk_free_rate: f64,
    /// Trading days in the realized-volatility window.
    pub realized_vol_window: usize,
    /// Volatility assumed for a ticker with neither an implied quote nor
    /// enough history for a realized estimate.
    pub fallback_volatility: f64,
    pub solver: StrikeSolver,
}

impl Default for PricingSection {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.05,
            realized_vol_window: 30,
            fallback_volatility: 0.30,
            solver: StrikeSolver::default(),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub universe: UniverseSection,
    pub long: LongSection,
    pub short: ShortSection,
    pub pricing: PricingSection,
    pub strategy: StrategyParams,
    pub guard: VolatilityGuard,
    pub entry: EntryParams,
    pub sizing: SizingParams,
    pub exits: ExitParams,
}

impl EngineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deterministic BLAKE3 hash of the configuration, recorded with
    /// every signal so results can be traced back to their parameters.
    pub fn config_hash(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => blake3::hash(json.as_bytes()).to_hex().to_string(),
            Err(_) => String::new(),
        }
    }

    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.universe.size == 0 {
            return invalid("universe.size must be at least 1".into());
        }
        for (name, f) in [("long_filter", &self.universe.long_filter), ("short_filter", &self.universe.short_filter)] {
            for (field, value) in [
                ("min_market_cap", f.min_market_cap),
                ("min_avg_dollar_volume", f.min_avg_dollar_volume),
                ("min_avg_share_volume", f.min_avg_share_volume),
                ("min_price", f.min_price),
            ] {
                if !(value.is_finite() && value >= 0.0) {
                    return invalid(format!("universe.{name}.{field} must be non-negative, got {value}"));
                }
            }
            if f.max_one_year_return.is_some_and(|r| !r.is_finite()) {
                return invalid(format!("universe.{name}.max_one_year_return must be finite"));
            }
        }
        if self.long.top_n == 0 || self.short.top_n == 0 {
            return invalid("top_n must be at least 1".into());
        }

        let s = &self.strategy;
        if !(s.long_delta_min <= s.long_delta_target && s.long_delta_target <= s.long_delta_max && s.long_delta_max < 0.0) {
            return invalid(format!(
                "strategy long delta band must satisfy min <= target <= max < 0, got {} / {} / {}",
                s.long_delta_min, s.long_delta_target, s.long_delta_max
            ));
        }
        if !(s.short_delta_target > s.long_delta_target && s.short_delta_target < 0.0) {
            return invalid(format!(
                "strategy.short_delta_target {} must lie between the long target and zero",
                s.short_delta_target
            ));
        }
        if s.min_dte < 1 || s.min_dte > s.max_dte {
            return invalid(format!("strategy DTE band {}..{} is empty", s.min_dte, s.max_dte));
        }
        if !(s.multiplier > 0.0 && s.strike_increment > 0.0) {
            return invalid("strategy multiplier and strike_increment must be positive".into());
        }
        if !(s.min_spread_width_pct >= 0.0 && s.min_spread_width_pct < 1.0) {
            return invalid(format!(
                "strategy.min_spread_width_pct must be in [0, 1), got {}",
                s.min_spread_width_pct
            ));
        }

        let g = &self.guard;
        if !(0.0..=100.0).contains(&g.max_iv_rank) {
            return invalid(format!("guard.max_iv_rank must be within 0..=100, got {}", g.max_iv_rank));
        }
        if !(g.realized_vol_multiple > 0.0 && g.realized_vol_multiple.is_finite()) {
            return invalid(format!(
                "guard.realized_vol_multiple must be positive, got {}",
                g.realized_vol_multiple
            ));
        }

        let sz = &self.sizing;
        if !(sz.risk_per_trade_pct > 0.0 && sz.risk_per_trade_pct <= sz.monthly_risk_cap_pct && sz.monthly_risk_cap_pct <= 1.0) {
            return invalid(format!(
                "sizing requires 0 < risk_per_trade_pct ({}) <= monthly_risk_cap_pct ({}) <= 1",
                sz.risk_per_trade_pct, sz.monthly_risk_cap_pct
            ));
        }

        let ex = &self.exits;
        if !(ex.take_profit_multiple > 1.0) {
            return invalid(format!("exits.take_profit_multiple must exceed 1, got {}", ex.take_profit_multiple));
        }
        if !(ex.stop_loss_multiple > 0.0 && ex.stop_loss_multiple < 1.0) {
            return invalid(format!("exits.stop_loss_multiple must be in (0, 1), got {}", ex.stop_loss_multiple));
        }
        if let TakeProfitMode::Partial { fraction } = ex.take_profit_mode {
            if !(fraction > 0.0 && fraction < 1.0) {
                return invalid(format!("partial take-profit fraction must be in (0, 1), got {fraction}"));
            }
        }
        if ex.time_stop_days < 0 {
            return invalid("exits.time_stop_days must be non-negative".into());
        }

        let e = &self.entry;
        if !(e.rsi_min < e.rsi_max) || e.rsi_period == 0 {
            return invalid(format!("entry RSI band {}..{} is empty", e.rsi_min, e.rsi_max));
        }

        if self.pricing.realized_vol_window < 2 {
            return invalid("pricing.realized_vol_window must be at least 2".into());
        }
        if !self.pricing.risk_free_rate.is_finite() {
            return invalid("pricing.risk_free_rate must be finite".into());
        }
        if !(self.pricing.fallback_volatility > 0.0 && self.pricing.fallback_volatility.is_finite()) {
            return invalid(format!(
                "pricing.fallback_volatility must be positive, got {}",
                self.pricing.fallback_volatility
            ));
        }
        Ok(())
    }
}
