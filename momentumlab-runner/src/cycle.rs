//! Universe, long and short cycles over one market snapshot.
//!
//! Per-ticker work is independent, so it fans out with rayon. Results are
//! collected in ticker order and then sorted by the core's ranking rules,
//! which makes a parallel run identical to a serial one. A failing ticker
//! becomes an [`Exclusion`] and never aborts the cycle.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use momentumlab_core::domain::{Direction, PriceSeries};
use momentumlab_core::entry::{EntryConditionSet, EntryDecision, EntryEvaluation};
use momentumlab_core::error::EngineError;
use momentumlab_core::indicators::RealizedVol;
use momentumlab_core::momentum::{
    evaluate_short_filters, long_momentum, long_recommendations, select_top_n, short_momentum, MomentumRecord,
    Recommendation, ShortFilterCheck,
};
use momentumlab_core::strategy::{BuildOutcome, StrategyBuilder, UnderlyingSnapshot, VolatilityInputs};
use momentumlab_core::universe::{rank_universe, UniverseFilter, UniverseRanking};

use crate::config::EngineConfig;
use crate::data_loader::MarketSnapshot;

/// A ticker dropped from this cycle, with the stage that dropped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub ticker: String,
    pub stage: String,
    /// Stable error label, e.g. `insufficient_history`.
    pub kind: String,
    pub reason: String,
}

impl Exclusion {
    fn new(ticker: &str, stage: &str, kind: &str, reason: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            stage: stage.to_string(),
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    fn from_error(ticker: &str, stage: &str, err: &EngineError) -> Self {
        Self::new(ticker, stage, err.kind(), err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongCycle {
    pub as_of: NaiveDate,
    pub config_hash: String,
    pub dataset_hash: String,
    pub universe_size: usize,
    pub recommendations: Vec<Recommendation>,
    pub exclusions: Vec<Exclusion>,
}

/// One selected short candidate, carried through entry and construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortCandidate {
    pub rank: usize,
    pub ticker: String,
    pub record: MomentumRecord,
    pub filters: ShortFilterCheck,
    pub volatility: VolatilityInputs,
    pub spot: f64,
    pub entry: EntryEvaluation,
    pub strategy: BuildOutcome,
    /// Entry decision, downgraded to `Reject` when construction failed.
    pub decision: EntryDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortCycle {
    pub as_of: NaiveDate,
    pub config_hash: String,
    pub dataset_hash: String,
    pub universe_size: usize,
    pub candidates: Vec<ShortCandidate>,
    /// Tickers scored but failing the hard momentum filters.
    pub screened_out: Vec<(String, ShortFilterCheck)>,
    pub exclusions: Vec<Exclusion>,
}

impl ShortCycle {
    pub fn entries(&self) -> impl Iterator<Item = &ShortCandidate> {
        self.candidates.iter().filter(|c| c.decision == EntryDecision::Enter)
    }
}

pub struct CycleRunner<'a> {
    config: &'a EngineConfig,
    parallel: bool,
}

impl<'a> CycleRunner<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config, parallel: true }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn map_each<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.parallel {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }

    fn filter_for(&self, direction: Direction) -> &UniverseFilter {
        match direction {
            Direction::Long => &self.config.universe.long_filter,
            Direction::Short => &self.config.universe.short_filter,
        }
    }

    pub fn universe(&self, snapshot: &MarketSnapshot, direction: Direction) -> UniverseRanking {
        let ranking = rank_universe(
            &snapshot.candidates(),
            self.filter_for(direction),
            self.config.universe.size,
        );
        info!(
            %direction,
            candidates = ranking.total_candidates,
            passed = ranking.passed_filter(),
            ranked = ranking.ranked.len(),
            "universe ranked"
        );
        ranking
    }

    /// Tickers to score: the ranked universe, or every priced ticker when
    /// the snapshot was loaded without a fundamentals file.
    fn universe_tickers(&self, snapshot: &MarketSnapshot, direction: Direction) -> Vec<String> {
        if !snapshot.has_fundamentals {
            warn!("no fundamentals in snapshot, scoring every priced ticker");
            return snapshot.series.keys().cloned().collect();
        }
        self.universe(snapshot, direction)
            .ranked
            .into_iter()
            .map(|r| r.candidate.ticker)
            .collect()
    }

    pub fn long(&self, snapshot: &MarketSnapshot) -> LongCycle {
        let tickers = self.universe_tickers(snapshot, Direction::Long);
        let scored = self.map_each(&tickers, |t| -> Result<MomentumRecord, Exclusion> {
            let series = lookup(snapshot, t, "momentum")?;
            long_momentum(series).map_err(|e| Exclusion::from_error(t, "momentum", &e))
        });

        let (records, exclusions) = split(scored);
        let recommendations = long_recommendations(&records, self.config.long.top_n);
        info!(
            scored = records.len(),
            excluded = exclusions.len(),
            selected = recommendations.iter().filter(|r| r.allocation_pct > 0.0).count(),
            "long cycle complete"
        );

        LongCycle {
            as_of: snapshot.as_of,
            config_hash: self.config.config_hash(),
            dataset_hash: snapshot.dataset_hash.clone(),
            universe_size: tickers.len(),
            recommendations,
            exclusions,
        }
    }

    pub fn short(&self, snapshot: &MarketSnapshot) -> ShortCycle {
        let tickers = self.universe_tickers(snapshot, Direction::Short);
        let params = &self.config.short.signal;

        let scored = self.map_each(&tickers, |t| -> Result<(MomentumRecord, ShortFilterCheck), Exclusion> {
            let series = lookup(snapshot, t, "momentum")?;
            let record = short_momentum(series).map_err(|e| Exclusion::from_error(t, "momentum", &e))?;
            let check =
                evaluate_short_filters(series, &record, params).map_err(|e| Exclusion::from_error(t, "filters", &e))?;
            Ok((record, check))
        });
        let (scored, mut exclusions) = split(scored);

        let mut records = Vec::new();
        let mut checks = BTreeMap::new();
        let mut screened_out = Vec::new();
        for (record, check) in scored {
            if check.passed() {
                checks.insert(record.ticker.clone(), check);
                records.push(record);
            } else {
                debug!(ticker = %record.ticker, failures = ?check.failures, "short filters failed");
                screened_out.push((record.ticker.clone(), check));
            }
        }

        let selected = select_top_n(&records, self.config.short.top_n, Direction::Short);

        let builder = StrategyBuilder::new(
            self.config.strategy.clone(),
            self.config.guard.clone(),
            self.config.pricing.solver.clone(),
        );
        let entry = EntryConditionSet::standard(&self.config.entry, &self.config.guard);
        let rv = RealizedVol::new(self.config.pricing.realized_vol_window);

        let evaluated = self.map_each(&selected, |s| -> Result<ShortCandidate, Exclusion> {
            let ticker = s.record.ticker.as_str();
            let series = lookup(snapshot, ticker, "entry")?;
            let spot = series
                .last_close()
                .ok_or_else(|| Exclusion::new(ticker, "entry", "insufficient_history", "empty series"))?;
            let quote = snapshot.volatility.get(ticker);
            let volatility = match quote {
                Some(q) => VolatilityInputs {
                    implied_vol: q.implied_vol,
                    iv_rank: q.iv_rank,
                    realized_vol_30d: rv.latest_or(series.bars(), f64::NAN),
                },
                None => {
                    let estimate = rv.latest_or(series.bars(), self.config.pricing.fallback_volatility);
                    debug!(ticker, estimate, "no implied volatility quote, using realized estimate");
                    VolatilityInputs {
                        implied_vol: estimate,
                        iv_rank: None,
                        realized_vol_30d: estimate,
                    }
                }
            };

            let evaluation = entry
                .evaluate(series, &volatility)
                .map_err(|e| Exclusion::from_error(ticker, "entry", &e))?;
            let strategy = builder.build(&UnderlyingSnapshot {
                ticker: ticker.to_string(),
                as_of: snapshot.as_of,
                spot,
                risk_free_rate: snapshot.risk_free_rate,
                volatility,
                expiries: quote.map(|q| q.expiries.clone()).unwrap_or_default(),
            });
            let decision = match &strategy {
                BuildOutcome::Built { .. } => evaluation.decision,
                BuildOutcome::Rejected { reason } => {
                    debug!(ticker, %reason, "strategy rejected");
                    EntryDecision::Reject
                }
            };

            let filters = checks.get(ticker).cloned().unwrap_or_default();

            Ok(ShortCandidate {
                rank: s.rank,
                ticker: ticker.to_string(),
                record: s.record.clone(),
                filters,
                volatility,
                spot,
                entry: evaluation,
                strategy,
                decision,
            })
        });
        let (candidates, late) = split(evaluated);
        exclusions.extend(late);

        info!(
            universe = tickers.len(),
            passed_filters = records.len(),
            selected = candidates.len(),
            enter = candidates.iter().filter(|c| c.decision == EntryDecision::Enter).count(),
            excluded = exclusions.len(),
            "short cycle complete"
        );

        ShortCycle {
            as_of: snapshot.as_of,
            config_hash: self.config.config_hash(),
            dataset_hash: snapshot.dataset_hash.clone(),
            universe_size: tickers.len(),
            candidates,
            screened_out,
            exclusions,
        }
    }
}

fn lookup<'s>(snapshot: &'s MarketSnapshot, ticker: &str, stage: &str) -> Result<&'s PriceSeries, Exclusion> {
    snapshot
        .series
        .get(ticker)
        .ok_or_else(|| Exclusion::new(ticker, stage, "missing_prices", "no price series in snapshot"))
}

/// Partitions per-ticker results, logging every exclusion.
fn split<T>(results: Vec<Result<T, Exclusion>>) -> (Vec<T>, Vec<Exclusion>) {
    let mut ok = Vec::new();
    let mut excluded = Vec::new();
    for r in results {
        match r {
            Ok(v) => ok.push(v),
            Err(e) => {
                debug!(ticker = %e.ticker, stage = %e.stage, reason = %e.reason, "ticker excluded");
                excluded.push(e);
            }
        }
    }
    (ok, excluded)
}
