//! Momentum scoring and Top-N selection for both strategy directions.
//!
//! Records are immutable once computed for an as-of date and are recomputed
//! from fresh series each cycle. A ticker without enough history is excluded
//! with `InsufficientHistory`, never scored as zero.

pub mod long;
pub mod select;
pub mod short;

pub use long::{long_momentum, LONG_REQUIRED_MONTHS};
pub use select::{long_recommendations, select_top_n, RankedSignal, Recommendation};
pub use short::{
    evaluate_short_filters, short_momentum, ShortFilterCheck, ShortFilterFailure,
    ShortSignalParams, ShortWindows, SHORT_REQUIRED_OBSERVATIONS,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumRecord {
    pub ticker: String,
    pub as_of: NaiveDate,
    pub score: f64,
    /// Named sub-returns and the prices they were computed from.
    pub components: BTreeMap<String, f64>,
    pub direction: Direction,
}

impl MomentumRecord {
    pub fn component(&self, name: &str) -> Option<f64> {
        self.components.get(name).copied()
    }
}
