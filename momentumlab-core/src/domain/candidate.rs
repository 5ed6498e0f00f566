use serde::{Deserialize, Serialize};

/// Fundamentals snapshot for one ticker in a ranking cycle.
///
/// Derived per cycle and read-only. Optional fields are only consulted by the
/// short-side universe filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseCandidate {
    pub ticker: String,
    pub market_cap: f64,
    pub avg_dollar_volume: f64,
    pub price: f64,
    #[serde(default)]
    pub avg_share_volume: f64,
    #[serde(default = "default_shortable")]
    pub shortable: bool,
    #[serde(default)]
    pub days_to_earnings: Option<u32>,
    #[serde(default)]
    pub one_year_return: Option<f64>,
}

fn default_shortable() -> bool {
    true
}

impl UniverseCandidate {
    pub fn new(ticker: impl Into<String>, market_cap: f64, avg_dollar_volume: f64, price: f64) -> Self {
        let avg_share_volume = if price > 0.0 {
            avg_dollar_volume / price
        } else {
            0.0
        };
        Self {
            ticker: ticker.into(),
            market_cap,
            avg_dollar_volume,
            price,
            avg_share_volume,
            shortable: true,
            days_to_earnings: None,
            one_year_return: None,
        }
    }
}
