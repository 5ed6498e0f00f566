//! Price-derived indicators used by the trend gate, the entry scorer, the
//! volatility guard and the risk-event exit.
//!
//! Indicators are pure functions of bar history: the output series has the
//! same length as the input and the first `lookback()` values are NaN. No
//! value at bar t may depend on a bar after t.

pub mod iv_rank;
pub mod realized_vol;
pub mod rsi;
pub mod sma;

pub use iv_rank::iv_rank;
pub use realized_vol::RealizedVol;
pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::PriceBar;

pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_50", "rsi_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;
}

/// Most recent finite value of an indicator, if any.
pub fn latest(indicator: &dyn Indicator, bars: &[PriceBar]) -> Option<f64> {
    indicator
        .compute(bars)
        .last()
        .copied()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar::new(base_date + chrono::Duration::days(i as i64), close, 1000))
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_skips_warmup() {
        let bars = make_bars(&[1.0, 2.0]);
        assert_eq!(latest(&Sma::new(3), &bars), None);
        assert_eq!(latest(&Sma::new(2), &bars), Some(1.5));
    }
}
