//! Realized (historical) volatility.
//!
//! Annualized standard deviation of daily close-to-close log returns over a
//! rolling window, using population variance and a 252-day year.
//! Lookback: window (a window of N returns needs N+1 closes).

use super::Indicator;
use crate::domain::PriceBar;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone)]
pub struct RealizedVol {
    window: usize,
    name: String,
}

impl RealizedVol {
    pub fn new(window: usize) -> Self {
        assert!(window >= 2, "realized vol window must be >= 2");
        Self {
            window,
            name: format!("rv_{window}"),
        }
    }

    /// Latest annualized value, or `fallback` when history is too short.
    pub fn latest_or(&self, bars: &[PriceBar], fallback: f64) -> f64 {
        super::latest(self, bars).unwrap_or(fallback)
    }
}

impl Indicator for RealizedVol {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        if n < self.window + 1 {
            return result;
        }

        let returns: Vec<f64> = bars
            .windows(2)
            .map(|w| (w[1].close / w[0].close).ln())
            .collect();

        for i in self.window..n {
            // returns[j] is the return into bar j + 1
            let slice = &returns[(i - self.window)..i];
            let mean = slice.iter().sum::<f64>() / self.window as f64;
            let var = slice.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / self.window as f64;
            result[i] = var.sqrt() * TRADING_DAYS_PER_YEAR.sqrt();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn constant_growth_has_zero_vol() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 * 1.01_f64.powi(i)).collect();
        let result = RealizedVol::new(30).compute(&make_bars(&closes));
        assert!(result[29].is_nan());
        assert_approx(result[30], 0.0, 1e-9);
    }

    #[test]
    fn alternating_returns_match_closed_form() {
        // Log returns alternate +x, -x: population std = x.
        let x: f64 = 0.02;
        let mut closes = vec![100.0];
        for i in 0..10 {
            let last = *closes.last().unwrap();
            closes.push(last * if i % 2 == 0 { x.exp() } else { (-x).exp() });
        }
        let result = RealizedVol::new(10).compute(&make_bars(&closes));
        assert_approx(result[10], x * 252.0_f64.sqrt(), 1e-9);
    }

    #[test]
    fn latest_or_falls_back_on_short_history() {
        let bars = make_bars(&[100.0, 101.0]);
        assert_eq!(RealizedVol::new(30).latest_or(&bars, 0.30), 0.30);
    }
}
