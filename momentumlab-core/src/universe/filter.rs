use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::UniverseCandidate;

/// Why a candidate was kept out of the universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterRejection {
    MarketCap,
    DollarVolume,
    ShareVolume,
    Price,
    NotShortable,
    EarningsProximity,
    OneYearReturn,
}

impl fmt::Display for FilterRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MarketCap => "market_cap",
            Self::DollarVolume => "dollar_volume",
            Self::ShareVolume => "share_volume",
            Self::Price => "price",
            Self::NotShortable => "not_shortable",
            Self::EarningsProximity => "earnings_proximity",
            Self::OneYearReturn => "one_year_return",
        };
        f.write_str(s)
    }
}

/// Hard universe filter.
///
/// The long preset only gates size and liquidity. The short preset adds the
/// shortability, earnings-blackout and weak-year exclusions, and its price
/// floor doubles as the penny-stock exclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseFilter {
    pub min_market_cap: f64,
    pub min_avg_dollar_volume: f64,
    pub min_avg_share_volume: f64,
    pub min_price: f64,
    pub require_shortable: bool,
    /// Exclude when earnings are this many days away or fewer.
    pub earnings_blackout_days: Option<u32>,
    /// Exclude when the trailing one-year return is above this fraction.
    pub max_one_year_return: Option<f64>,
}

impl Default for UniverseFilter {
    fn default() -> Self {
        Self::long()
    }
}

impl UniverseFilter {
    pub fn long() -> Self {
        Self {
            min_market_cap: 1_000_000_000.0,
            min_avg_dollar_volume: 5_000_000.0,
            min_avg_share_volume: 0.0,
            min_price: 5.0,
            require_shortable: false,
            earnings_blackout_days: None,
            max_one_year_return: None,
        }
    }

    pub fn short() -> Self {
        Self {
            min_market_cap: 2_000_000_000.0,
            min_avg_dollar_volume: 5_000_000.0,
            min_avg_share_volume: 500_000.0,
            min_price: 5.0,
            require_shortable: true,
            earnings_blackout_days: Some(7),
            max_one_year_return: Some(-0.20),
        }
    }

    /// First failing filter, checked in a fixed order.
    pub fn check(&self, c: &UniverseCandidate) -> Result<(), FilterRejection> {
        if !at_least(c.market_cap, self.min_market_cap) {
            return Err(FilterRejection::MarketCap);
        }
        if !at_least(c.avg_dollar_volume, self.min_avg_dollar_volume) {
            return Err(FilterRejection::DollarVolume);
        }
        if !at_least(c.avg_share_volume, self.min_avg_share_volume) {
            return Err(FilterRejection::ShareVolume);
        }
        if !at_least(c.price, self.min_price) {
            return Err(FilterRejection::Price);
        }
        if self.require_shortable && !c.shortable {
            return Err(FilterRejection::NotShortable);
        }
        if let (Some(blackout), Some(days)) = (self.earnings_blackout_days, c.days_to_earnings) {
            if days <= blackout {
                return Err(FilterRejection::EarningsProximity);
            }
        }
        if let Some(max) = self.max_one_year_return {
            match c.one_year_return {
                Some(r) if r <= max => {}
                _ => return Err(FilterRejection::OneYearReturn),
            }
        }
        Ok(())
    }
}

/// False for NaN, so an unknown value never slips through a floor.
fn at_least(value: f64, min: f64) -> bool {
    value >= min
}

#[cfg(test)]
mod tests {
    use super::*;

    fn liquid(ticker: &str) -> UniverseCandidate {
        UniverseCandidate::new(ticker, 50e9, 200e6, 100.0)
    }

    #[test]
    fn long_filter_checks_size_and_liquidity() {
        let f = UniverseFilter::long();
        assert_eq!(f.check(&liquid("OK")), Ok(()));

        let small = UniverseCandidate::new("SMALL", 500e6, 200e6, 100.0);
        assert_eq!(f.check(&small), Err(FilterRejection::MarketCap));

        let thin = UniverseCandidate::new("THIN", 50e9, 1e6, 100.0);
        assert_eq!(f.check(&thin), Err(FilterRejection::DollarVolume));

        let penny = UniverseCandidate::new("PENNY", 50e9, 200e6, 2.0);
        assert_eq!(f.check(&penny), Err(FilterRejection::Price));
    }

    #[test]
    fn zero_market_cap_is_filtered_not_scored() {
        let c = UniverseCandidate::new("ZERO", 0.0, 200e6, 100.0);
        assert_eq!(UniverseFilter::long().check(&c), Err(FilterRejection::MarketCap));
    }

    #[test]
    fn nan_inputs_fail_the_filter() {
        let c = UniverseCandidate::new("NAN", f64::NAN, 200e6, 100.0);
        assert_eq!(UniverseFilter::long().check(&c), Err(FilterRejection::MarketCap));
    }

    #[test]
    fn short_filter_exclusions() {
        let f = UniverseFilter::short();
        let mut c = liquid("S");
        c.one_year_return = Some(-0.35);
        assert_eq!(f.check(&c), Ok(()));

        let mut not_shortable = c.clone();
        not_shortable.shortable = false;
        assert_eq!(f.check(&not_shortable), Err(FilterRejection::NotShortable));

        let mut earnings = c.clone();
        earnings.days_to_earnings = Some(3);
        assert_eq!(f.check(&earnings), Err(FilterRejection::EarningsProximity));
        earnings.days_to_earnings = Some(30);
        assert_eq!(f.check(&earnings), Ok(()));

        let mut strong = c.clone();
        strong.one_year_return = Some(0.10);
        assert_eq!(f.check(&strong), Err(FilterRejection::OneYearReturn));

        let mut unknown = c;
        unknown.one_year_return = None;
        assert_eq!(f.check(&unknown), Err(FilterRejection::OneYearReturn));
    }
}
