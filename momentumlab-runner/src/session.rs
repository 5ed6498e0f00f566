//! One-call entry points that load inputs, run a cycle and persist state.

use std::path::Path;
use thiserror::Error;

use momentumlab_core::domain::Direction;
use momentumlab_core::universe::UniverseRanking;

use crate::config::{ConfigError, EngineConfig};
use crate::cycle::{CycleRunner, LongCycle, ShortCycle};
use crate::data_loader::{load_snapshot, LoadError, LoadOptions, MarketSnapshot};
use crate::history::{JsonlLog, SignalRecord};
use crate::manage::{lifecycle_manager, open_entries, run_exit_pass, ExitPass, OpenReport};
use crate::persistence::{StoreError, StoreFile};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("signal history write failed: {0}")]
    History(#[from] std::io::Error),
}

/// Config from a file, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, RunError> {
    match path {
        Some(p) => Ok(EngineConfig::from_file(p)?),
        None => Ok(EngineConfig::default()),
    }
}

pub fn load_market(data_dir: &Path, config: &EngineConfig) -> Result<MarketSnapshot, RunError> {
    let opts = LoadOptions {
        as_of: None,
        risk_free_rate: config.pricing.risk_free_rate,
    };
    Ok(load_snapshot(data_dir, &opts)?)
}

pub fn rank_universe_at(
    data_dir: &Path,
    config: &EngineConfig,
    direction: Direction,
) -> Result<UniverseRanking, RunError> {
    let snapshot = load_market(data_dir, config)?;
    Ok(CycleRunner::new(config).universe(&snapshot, direction))
}

/// Runs the long cycle and appends its signals to `history` when given.
pub fn run_long(
    data_dir: &Path,
    config: &EngineConfig,
    history: Option<&Path>,
) -> Result<LongCycle, RunError> {
    let snapshot = load_market(data_dir, config)?;
    let cycle = CycleRunner::new(config).long(&snapshot);
    if let Some(path) = history {
        JsonlLog::new(path).append_all(&SignalRecord::from_long(&cycle))?;
    }
    Ok(cycle)
}

#[derive(Debug)]
pub struct ShortRun {
    pub cycle: ShortCycle,
    /// Present when positions were opened from the cycle's ENTER candidates.
    pub opened: Option<OpenReport>,
}

/// Runs the short cycle; with `open_capital`, opens ENTER candidates into
/// the store at `store_path` and saves it.
pub fn run_short(
    data_dir: &Path,
    config: &EngineConfig,
    history: Option<&Path>,
    store_path: &Path,
    open_capital: Option<f64>,
) -> Result<ShortRun, RunError> {
    let snapshot = load_market(data_dir, config)?;
    let cycle = CycleRunner::new(config).short(&snapshot);
    if let Some(path) = history {
        JsonlLog::new(path).append_all(&SignalRecord::from_short(&cycle))?;
    }

    let opened = match open_capital {
        Some(capital) => {
            let file = StoreFile::new(store_path);
            let mut store = file.load()?;
            let report = open_entries(&cycle, &mut store, &lifecycle_manager(config), capital);
            file.save(&mut store)?;
            Some(report)
        }
        None => None,
    };
    Ok(ShortRun { cycle, opened })
}

/// Values every open position against the snapshot, applies exits and
/// saves the store.
pub fn run_manage(data_dir: &Path, config: &EngineConfig, store_path: &Path) -> Result<ExitPass, RunError> {
    let snapshot = load_market(data_dir, config)?;
    let file = StoreFile::new(store_path);
    let mut store = file.load()?;
    let pass = run_exit_pass(&snapshot, &mut store, &lifecycle_manager(config), config);
    file.save(&mut store)?;
    Ok(pass)
}
