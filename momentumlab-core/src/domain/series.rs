//! Validated per-ticker price history.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::PriceBar;
use crate::error::{EngineError, EngineResult};

/// Ordered daily history for one ticker.
///
/// Invariants, checked at construction: dates strictly increasing, closes
/// finite and positive, opens (when present) finite and positive. No gaps are
/// assumed; consumers call [`PriceSeries::require`] before using a lookback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> EngineResult<Self> {
        let ticker = ticker.into();
        for (i, bar) in bars.iter().enumerate() {
            if !bar.close.is_finite() || bar.close <= 0.0 {
                return Err(EngineError::InvalidSeries {
                    ticker,
                    detail: format!("close {} on {} is not a positive number", bar.close, bar.date),
                });
            }
            if let Some(open) = bar.open {
                if !open.is_finite() || open <= 0.0 {
                    return Err(EngineError::InvalidSeries {
                        ticker,
                        detail: format!("open {open} on {} is not a positive number", bar.date),
                    });
                }
            }
            if i > 0 && bars[i - 1].date >= bar.date {
                return Err(EngineError::InvalidSeries {
                    ticker,
                    detail: format!("dates not strictly increasing at {}", bar.date),
                });
            }
        }
        Ok(Self { ticker, bars })
    }

    /// Build a series from closes on consecutive weekdays starting at `start`.
    pub fn from_closes(
        ticker: impl Into<String>,
        start: NaiveDate,
        closes: &[f64],
    ) -> EngineResult<Self> {
        let mut date = start;
        let mut bars = Vec::with_capacity(closes.len());
        for &close in closes {
            while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                date += Duration::days(1);
            }
            bars.push(PriceBar::new(date, close, 1_000_000));
            date += Duration::days(1);
        }
        Self::new(ticker, bars)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// Date of the most recent observation.
    pub fn as_of(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// `price[t - k]`, where `t` is the most recent bar.
    pub fn close_back(&self, k: usize) -> Option<f64> {
        let n = self.bars.len();
        if k < n {
            Some(self.bars[n - 1 - k].close)
        } else {
            None
        }
    }

    /// Fail with `InsufficientHistory` unless at least `required` bars exist.
    pub fn require(&self, required: usize) -> EngineResult<()> {
        if self.bars.len() < required {
            return Err(EngineError::InsufficientHistory {
                ticker: self.ticker.clone(),
                required,
                available: self.bars.len(),
            });
        }
        Ok(())
    }

    /// Last close of each calendar month, oldest first.
    ///
    /// The final entry is the latest bar, even when its month is incomplete.
    pub fn month_end_closes(&self) -> Vec<(NaiveDate, f64)> {
        let mut out: Vec<(NaiveDate, f64)> = Vec::new();
        for bar in &self.bars {
            match out.last_mut() {
                Some(last)
                    if last.0.year() == bar.date.year() && last.0.month() == bar.date.month() =>
                {
                    *last = (bar.date, bar.close);
                }
                _ => out.push((bar.date, bar.close)),
            }
        }
        out
    }

    /// Point-in-time view: every bar on or before `date`.
    pub fn as_of_date(&self, date: NaiveDate) -> Self {
        let end = self.bars.partition_point(|b| b.date <= date);
        Self {
            ticker: self.ticker.clone(),
            bars: self.bars[..end].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rejects_non_increasing_dates() {
        let bars = vec![
            PriceBar::new(d(2024, 1, 3), 10.0, 100),
            PriceBar::new(d(2024, 1, 3), 11.0, 100),
        ];
        let err = PriceSeries::new("DUP", bars).unwrap_err();
        assert_eq!(err.kind(), "invalid_series");
    }

    #[test]
    fn rejects_non_positive_close() {
        let bars = vec![PriceBar::new(d(2024, 1, 3), 0.0, 100)];
        assert!(PriceSeries::new("ZERO", bars).is_err());
        let bars = vec![PriceBar::new(d(2024, 1, 3), f64::NAN, 100)];
        assert!(PriceSeries::new("NAN", bars).is_err());
    }

    #[test]
    fn from_closes_skips_weekends() {
        // 2024-01-05 is a Friday.
        let s = PriceSeries::from_closes("W", d(2024, 1, 5), &[1.0, 2.0, 3.0]).unwrap();
        let dates: Vec<_> = s.bars().iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 5), d(2024, 1, 8), d(2024, 1, 9)]);
    }

    #[test]
    fn close_back_indexes_from_latest() {
        let s = PriceSeries::from_closes("T", d(2024, 1, 2), &[10.0, 11.0, 12.0]).unwrap();
        assert_eq!(s.close_back(0), Some(12.0));
        assert_eq!(s.close_back(2), Some(10.0));
        assert_eq!(s.close_back(3), None);
    }

    #[test]
    fn require_reports_counts() {
        let s = PriceSeries::from_closes("T", d(2024, 1, 2), &[10.0, 11.0]).unwrap();
        assert!(s.require(2).is_ok());
        match s.require(5) {
            Err(EngineError::InsufficientHistory {
                ticker,
                required,
                available,
            }) => {
                assert_eq!(ticker, "T");
                assert_eq!(required, 5);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn month_end_closes_take_last_bar_per_month() {
        let bars = vec![
            PriceBar::new(d(2024, 1, 30), 10.0, 1),
            PriceBar::new(d(2024, 1, 31), 11.0, 1),
            PriceBar::new(d(2024, 2, 1), 12.0, 1),
            PriceBar::new(d(2024, 2, 29), 13.0, 1),
            PriceBar::new(d(2024, 3, 4), 14.0, 1),
        ];
        let s = PriceSeries::new("M", bars).unwrap();
        assert_eq!(
            s.month_end_closes(),
            vec![(d(2024, 1, 31), 11.0), (d(2024, 2, 29), 13.0), (d(2024, 3, 4), 14.0)]
        );
    }

    #[test]
    fn as_of_date_truncates() {
        let s = PriceSeries::from_closes("T", d(2024, 1, 2), &[10.0, 11.0, 12.0]).unwrap();
        let cut = s.as_of_date(d(2024, 1, 3));
        assert_eq!(cut.len(), 2);
        assert_eq!(cut.last_close(), Some(11.0));
    }
}
