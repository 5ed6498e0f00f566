//! Top-N selection and equal-weight recommendations.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::MomentumRecord;
use crate::domain::{Direction, Signal};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSignal {
    /// 1-based.
    pub rank: usize,
    pub signal: Signal,
    pub record: MomentumRecord,
}

/// Long: score descending. Short: score ascending (most negative first).
/// Equal scores fall back to ticker order so output is reproducible.
fn compare(direction: Direction, a: &MomentumRecord, b: &MomentumRecord) -> Ordering {
    let by_score = match direction {
        Direction::Long => b.score.total_cmp(&a.score),
        Direction::Short => a.score.total_cmp(&b.score),
    };
    by_score.then_with(|| a.ticker.cmp(&b.ticker))
}

/// Keep the best `n` records for `direction`.
///
/// Records of the other direction are ignored.
pub fn select_top_n(records: &[MomentumRecord], n: usize, direction: Direction) -> Vec<RankedSignal> {
    let mut sorted: Vec<&MomentumRecord> = records.iter().filter(|r| r.direction == direction).collect();
    sorted.sort_by(|a, b| compare(direction, a, b));
    sorted
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, r)| RankedSignal {
            rank: i + 1,
            signal: Signal::entry_for(direction),
            record: r.clone(),
        })
        .collect()
}

/// One row of the long-strategy recommendation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub rank: usize,
    pub ticker: String,
    pub score: f64,
    pub signal: Signal,
    /// Percent of the long sleeve, rounded to 2 decimals.
    pub allocation_pct: f64,
}

/// Rank every long record; the top `top_n` get `Enter` with an equal share of
/// 100%, the rest get `Exit` with 0%.
pub fn long_recommendations(records: &[MomentumRecord], top_n: usize) -> Vec<Recommendation> {
    let ranked = select_top_n(records, usize::MAX, Direction::Long);
    let selected = top_n.min(ranked.len());
    let allocation = if selected > 0 {
        (100.0 / selected as f64 * 100.0).round() / 100.0
    } else {
        0.0
    };

    ranked
        .into_iter()
        .map(|r| {
            let enter = r.rank <= selected;
            Recommendation {
                rank: r.rank,
                ticker: r.record.ticker,
                score: r.record.score,
                signal: if enter { Signal::Enter } else { Signal::Exit },
                allocation_pct: if enter { allocation } else { 0.0 },
            }
        })
        .collect()
}
