//! Append-only JSONL logs.
//!
//! Each line is an independent JSON object, so a partial write damages at
//! most one record and the file can be streamed.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::cycle::{LongCycle, ShortCycle};

pub struct JsonlLog<T> {
    path: PathBuf,
    _entry: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> JsonlLog<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _entry: PhantomData,
        }
    }

    pub fn append(&self, entry: &T) -> io::Result<()> {
        self.append_all(std::slice::from_ref(entry))
    }

    pub fn append_all(&self, entries: &[T]) -> io::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        for entry in entries {
            let json = serde_json::to_string(entry).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            writeln!(file, "{json}")?;
        }
        file.flush()
    }

    /// All readable entries; malformed lines are skipped with a warning.
    pub fn read_all(&self) -> io::Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = io::BufReader::new(fs::File::open(&self.path)?);
        let mut entries = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(path = %self.path.display(), line = lineno + 1, error = %e, "malformed line skipped"),
            }
        }
        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// One signal in the signal history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub as_of: chrono::NaiveDate,
    pub ticker: String,
    pub direction: momentumlab_core::domain::Direction,
    pub rank: usize,
    pub score: f64,
    /// `ENTER`, `EXIT`, `WAIT`, ...
    pub action: String,
    pub allocation_pct: Option<f64>,
    pub config_hash: String,
    pub dataset_hash: String,
}

impl SignalRecord {
    pub fn from_long(cycle: &LongCycle) -> Vec<Self> {
        cycle
            .recommendations
            .iter()
            .map(|r| Self {
                as_of: cycle.as_of,
                ticker: r.ticker.clone(),
                direction: momentumlab_core::domain::Direction::Long,
                rank: r.rank,
                score: r.score,
                action: r.signal.to_string(),
                allocation_pct: Some(r.allocation_pct),
                config_hash: cycle.config_hash.clone(),
                dataset_hash: cycle.dataset_hash.clone(),
            })
            .collect()
    }

    pub fn from_short(cycle: &ShortCycle) -> Vec<Self> {
        cycle
            .candidates
            .iter()
            .map(|c| Self {
                as_of: cycle.as_of,
                ticker: c.ticker.clone(),
                direction: momentumlab_core::domain::Direction::Short,
                rank: c.rank,
                score: c.record.score,
                action: c.decision.to_string(),
                allocation_pct: None,
                config_hash: cycle.config_hash.clone(),
                dataset_hash: cycle.dataset_hash.clone(),
            })
            .collect()
    }
}
