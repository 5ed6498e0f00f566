//! MomentumLab Runner: cycle orchestration on top of `momentumlab-core`.
//!
//! - Snapshot loading from CSV, with a seeded synthetic fallback
//! - Long and short cycles, fanned out across tickers with rayon
//! - Position opening and exit passes against a persisted store
//! - JSONL signal history and closed-position log
//! - Markdown reports for the notification side

pub mod config;
pub mod cycle;
pub mod data_loader;
pub mod history;
pub mod manage;
pub mod persistence;
pub mod report;
pub mod session;
pub mod synthetic;

pub use config::{ConfigError, EngineConfig};
pub use cycle::{CycleRunner, Exclusion, LongCycle, ShortCandidate, ShortCycle};
pub use data_loader::{load_snapshot, save_snapshot, LoadError, LoadOptions, MarketSnapshot, VolatilityQuote};
pub use history::{JsonlLog, SignalRecord};
pub use manage::{open_entries, run_exit_pass, ExitPass, OpenReport};
pub use persistence::{StoreError, StoreFile};
pub use report::MarkdownReport;
pub use session::{load_config, run_long, run_manage, run_short, RunError, ShortRun};
pub use synthetic::{generate_snapshot, SyntheticSpec};
