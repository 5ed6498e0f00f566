//! Long momentum: 12-1 month return on month-end closes.
//!
//! momentum = (price[t-1mo] - price[t-12mo]) / price[t-12mo]
//!
//! The latest month is skipped to keep short-term mean reversion out of the
//! score.

use std::collections::BTreeMap;

use super::MomentumRecord;
use crate::domain::{Direction, PriceSeries};
use crate::error::{EngineError, EngineResult};

/// Twelve months of lookback plus the skipped month.
pub const LONG_REQUIRED_MONTHS: usize = 13;

pub fn long_momentum(series: &PriceSeries) -> EngineResult<MomentumRecord> {
    let monthly = series.month_end_closes();
    let n = monthly.len();
    if n < LONG_REQUIRED_MONTHS {
        return Err(EngineError::InsufficientHistory {
            ticker: series.ticker().to_string(),
            required: LONG_REQUIRED_MONTHS,
            available: n,
        });
    }

    let end_price = monthly[n - 2].1;
    let start_price = monthly[n - 13].1;
    let momentum = EngineError::ensure_finite("long_momentum", (end_price - start_price) / start_price)?;

    let mut components = BTreeMap::new();
    components.insert("price_t_1m".to_string(), end_price);
    components.insert("price_t_12m".to_string(), start_price);
    components.insert("return_12_1".to_string(), momentum);

    Ok(MomentumRecord {
        ticker: series.ticker().to_string(),
        as_of: monthly[n - 1].0,
        score: momentum,
        components,
        direction: Direction::Long,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceBar;
    use chrono::NaiveDate;

    /// One bar on the 15th of each month, starting January 2023.
    fn monthly_series(closes: &[f64]) -> PriceSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let y = 2023 + (i / 12) as i32;
                let m = (i % 12) as u32 + 1;
                PriceBar::new(NaiveDate::from_ymd_opt(y, m, 15).unwrap(), c, 1000)
            })
            .collect();
        PriceSeries::new("LONG", bars).unwrap()
    }

    #[test]
    fn skips_latest_month() {
        // 13 months: start 100, month 12 at 150, latest month spikes to 300.
        let mut closes = vec![100.0];
        closes.extend((1..12).map(|i| 100.0 + i as f64 * 50.0 / 11.0));
        closes.push(300.0);
        let rec = long_momentum(&monthly_series(&closes)).unwrap();
        assert!((rec.score - 0.5).abs() < 1e-12);
        assert_eq!(rec.component("price_t_12m"), Some(100.0));
        assert_eq!(rec.direction, Direction::Long);
    }

    #[test]
    fn requires_thirteen_months() {
        let err = long_momentum(&monthly_series(&[100.0; 12])).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientHistory {
                ticker: "LONG".into(),
                required: 13,
                available: 12
            }
        );
    }

    #[test]
    fn uses_last_bar_of_each_month() {
        // Two bars per month; only the later one counts.
        let mut bars = Vec::new();
        for i in 0..13u32 {
            let y = 2023 + (i / 12) as i32;
            let m = i % 12 + 1;
            bars.push(PriceBar::new(NaiveDate::from_ymd_opt(y, m, 3).unwrap(), 1.0, 1));
            let close = if i == 0 { 50.0 } else { 100.0 };
            bars.push(PriceBar::new(NaiveDate::from_ymd_opt(y, m, 20).unwrap(), close, 1));
        }
        let series = PriceSeries::new("TWO", bars).unwrap();
        let rec = long_momentum(&series).unwrap();
        assert!((rec.score - 1.0).abs() < 1e-12);
    }
}
