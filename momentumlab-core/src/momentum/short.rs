//! Short momentum: a trend window and the most recent week.
//!
//! perf_63_5 = price[t-5] / price[t-63] - 1   (trend)
//! perf_5_0  = price[t]   / price[t-5]  - 1   (latest week, informational)
//! score     = perf_63_5 - perf_5_0
//!
//! Selection keeps the most negative scores, subject to hard filters and the
//! `price < SMA50 < SMA200` trend confirmation gate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

use super::MomentumRecord;
use crate::domain::{Direction, PriceSeries};
use crate::error::{EngineError, EngineResult};
use crate::indicators::{latest, Sma};

pub const TREND_START_OFFSET: usize = 63;
pub const RECENT_OFFSET: usize = 5;

/// `price[t-63]` must exist, so 64 bars.
pub const SHORT_REQUIRED_OBSERVATIONS: usize = TREND_START_OFFSET + 1;

/// Bar indices of the two windows for a series whose latest bar is `t`.
///
/// Each window's return is the product of the daily returns on its return
/// days. The trend window earns on days `t-62 ..= t-5` and the recent window
/// on `t-4 ..= t`, so no trading day contributes to both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortWindows {
    pub trend_start: usize,
    pub trend_end: usize,
    pub recent_end: usize,
}

impl ShortWindows {
    /// `None` when `t` is too early for the trend window.
    pub fn ending_at(t: usize) -> Option<Self> {
        let trend_start = t.checked_sub(TREND_START_OFFSET)?;
        Some(Self {
            trend_start,
            trend_end: t - RECENT_OFFSET,
            recent_end: t,
        })
    }

    pub fn trend_return_days(&self) -> Range<usize> {
        (self.trend_start + 1)..(self.trend_end + 1)
    }

    pub fn recent_return_days(&self) -> Range<usize> {
        (self.trend_end + 1)..(self.recent_end + 1)
    }
}

pub fn short_momentum(series: &PriceSeries) -> EngineResult<MomentumRecord> {
    series.require(SHORT_REQUIRED_OBSERVATIONS)?;
    let bars = series.bars();
    let t = bars.len() - 1;
    let w = ShortWindows::ending_at(t).ok_or_else(|| EngineError::InsufficientHistory {
        ticker: series.ticker().to_string(),
        required: SHORT_REQUIRED_OBSERVATIONS,
        available: bars.len(),
    })?;

    let p_start = bars[w.trend_start].close;
    let p_mid = bars[w.trend_end].close;
    let p_now = bars[w.recent_end].close;

    let perf_63_5 = EngineError::ensure_finite("perf_63_5", p_mid / p_start - 1.0)?;
    let perf_5_0 = EngineError::ensure_finite("perf_5_0", p_now / p_mid - 1.0)?;
    let score = EngineError::ensure_finite("short_momentum", perf_63_5 - perf_5_0)?;

    let mut components = BTreeMap::new();
    components.insert("perf_63_5".to_string(), perf_63_5);
    components.insert("perf_5_0".to_string(), perf_5_0);
    components.insert("price".to_string(), p_now);

    Ok(MomentumRecord {
        ticker: series.ticker().to_string(),
        as_of: bars[t].date,
        score,
        components,
        direction: Direction::Short,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortSignalParams {
    /// Trend window return must be at or below this.
    pub max_perf_63_5: f64,
    /// Latest-week return must be at or below this.
    pub max_perf_5_0: f64,
    pub sma_fast: usize,
    pub sma_slow: usize,
    pub require_trend_confirmation: bool,
}

impl Default for ShortSignalParams {
    fn default() -> Self {
        Self {
            max_perf_63_5: -0.15,
            max_perf_5_0: 0.05,
            sma_fast: 50,
            sma_slow: 200,
            require_trend_confirmation: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortFilterFailure {
    TrendNotWeakEnough,
    RecentBounceTooStrong,
    PriceAboveFastSma,
    FastSmaAboveSlowSma,
}

/// Outcome of the short-side hard filters, with the values they saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShortFilterCheck {
    pub failures: Vec<ShortFilterFailure>,
    pub state: BTreeMap<String, f64>,
}

impl ShortFilterCheck {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply the hard filters to a computed short record.
///
/// The trend gate needs `sma_slow` bars; with trend confirmation enabled a
/// shorter series fails with `InsufficientHistory`. A missing or NaN value
/// fails its filter.
#[allow(clippy::neg_cmp_op_on_partial_ord)]
pub fn evaluate_short_filters(
    series: &PriceSeries,
    record: &MomentumRecord,
    params: &ShortSignalParams,
) -> EngineResult<ShortFilterCheck> {
    let mut failures = Vec::new();
    let mut state = BTreeMap::new();

    let perf_63_5 = record.component("perf_63_5").unwrap_or(f64::NAN);
    let perf_5_0 = record.component("perf_5_0").unwrap_or(f64::NAN);
    state.insert("perf_63_5".to_string(), perf_63_5);
    state.insert("perf_5_0".to_string(), perf_5_0);

    if !(perf_63_5 <= params.max_perf_63_5) {
        failures.push(ShortFilterFailure::TrendNotWeakEnough);
    }
    if !(perf_5_0 <= params.max_perf_5_0) {
        failures.push(ShortFilterFailure::RecentBounceTooStrong);
    }

    if params.require_trend_confirmation {
        series.require(params.sma_slow)?;
        let bars = series.bars();
        let price = series.last_close().unwrap_or(f64::NAN);
        let fast = latest(&Sma::new(params.sma_fast), bars).unwrap_or(f64::NAN);
        let slow = latest(&Sma::new(params.sma_slow), bars).unwrap_or(f64::NAN);
        state.insert("price".to_string(), price);
        state.insert(format!("sma_{}", params.sma_fast), fast);
        state.insert(format!("sma_{}", params.sma_slow), slow);

        if !(price < fast) {
            failures.push(ShortFilterFailure::PriceAboveFastSma);
        }
        if !(fast < slow) {
            failures.push(ShortFilterFailure::FastSmaAboveSlowSma);
        }
    }

    Ok(ShortFilterCheck { failures, state })
}
