use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{FilterRejection, UniverseFilter};
use crate::domain::UniverseCandidate;
use crate::error::{EngineError, EngineResult};

/// Default size of the ranked universe.
pub const DEFAULT_UNIVERSE_SIZE: usize = 50;

/// `ln(market_cap) * ln(avg_dollar_volume)`.
///
/// Fails with `Domain` when either input is not strictly positive or the
/// product is not finite.
pub fn universe_score(market_cap: f64, avg_dollar_volume: f64) -> EngineResult<f64> {
    if !is_positive(market_cap) || !is_positive(avg_dollar_volume) {
        return Err(EngineError::domain(
            "universe_score",
            format!("log undefined for market_cap={market_cap}, avg_dollar_volume={avg_dollar_volume}"),
        ));
    }
    EngineError::ensure_finite("universe_score", market_cap.ln() * avg_dollar_volume.ln())
}

fn is_positive(x: f64) -> bool {
    x > 0.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// 1-based.
    pub rank: usize,
    pub score: f64,
    pub candidate: UniverseCandidate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseRanking {
    pub ranked: Vec<RankedCandidate>,
    /// How many candidates each filter removed.
    pub filtered: BTreeMap<FilterRejection, usize>,
    /// Tickers whose score was undefined.
    pub unscorable: Vec<String>,
    pub total_candidates: usize,
}

impl UniverseRanking {
    pub fn tickers(&self) -> Vec<&str> {
        self.ranked.iter().map(|r| r.candidate.ticker.as_str()).collect()
    }

    pub fn passed_filter(&self) -> usize {
        self.total_candidates - self.filtered.values().sum::<usize>()
    }
}

/// Filter, score, sort by score descending (ties by ticker), keep `target_count`.
pub fn rank_universe(
    candidates: &[UniverseCandidate],
    filter: &UniverseFilter,
    target_count: usize,
) -> UniverseRanking {
    let mut filtered: BTreeMap<FilterRejection, usize> = BTreeMap::new();
    let mut unscorable = Vec::new();
    let mut scored: Vec<(f64, &UniverseCandidate)> = Vec::with_capacity(candidates.len());

    for c in candidates {
        if let Err(reason) = filter.check(c) {
            *filtered.entry(reason).or_default() += 1;
            continue;
        }
        match universe_score(c.market_cap, c.avg_dollar_volume) {
            Ok(score) => scored.push((score, c)),
            Err(e) => {
                debug!(ticker = %c.ticker, reason = %e, "dropping unscorable candidate");
                unscorable.push(c.ticker.clone());
            }
        }
    }

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.ticker.cmp(&b.1.ticker)));

    let ranked = scored
        .into_iter()
        .take(target_count)
        .enumerate()
        .map(|(i, (score, c))| RankedCandidate {
            rank: i + 1,
            score,
            candidate: c.clone(),
        })
        .collect();

    UniverseRanking {
        ranked,
        filtered,
        unscorable,
        total_candidates: candidates.len(),
    }
}
