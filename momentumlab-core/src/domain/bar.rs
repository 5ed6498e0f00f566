use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily observation for a ticker.
///
/// `close` is the split/dividend-adjusted close. `open` is optional and only
/// used to measure overnight gaps; when absent, gaps fall back to
/// close-to-close moves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
    #[serde(default)]
    pub open: Option<f64>,
}

impl PriceBar {
    pub fn new(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self {
            date,
            close,
            volume,
            open: None,
        }
    }

    pub fn with_open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Dollar volume traded on this bar.
    pub fn dollar_volume(&self) -> f64 {
        self.close * self.volume as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_volume_is_close_times_volume() {
        let bar = PriceBar::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 25.0, 1_000);
        assert_eq!(bar.dollar_volume(), 25_000.0);
        assert_eq!(bar.open, None);
        assert_eq!(bar.with_open(24.0).open, Some(24.0));
    }
}
