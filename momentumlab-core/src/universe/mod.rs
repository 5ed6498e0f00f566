//! Universe selection: hard pre-score filters, then the liquidity/size score.
//!
//! A candidate that fails a filter never receives a score. A candidate whose
//! score is undefined (non-positive market cap or dollar volume) is dropped
//! from the ranked set rather than ranked as zero.

pub mod filter;
pub mod ranking;

pub use filter::{FilterRejection, UniverseFilter};
pub use ranking::{rank_universe, universe_score, RankedCandidate, UniverseRanking, DEFAULT_UNIVERSE_SIZE};
