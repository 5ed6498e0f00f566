//! Position store persistence.
//!
//! The open book is a JSON snapshot rewritten each cycle (via a temp file
//! and rename). Closed positions leave the snapshot and are appended to
//! `closed_positions.jsonl` for audit.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use momentumlab_core::domain::PositionId;
use momentumlab_core::lifecycle::{Position, PositionStore};

use crate::history::JsonlLog;

pub const CLOSED_LOG_FILE: &str = "closed_positions.jsonl";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt position store '{path}': {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// File-backed home for a [`PositionStore`].
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Audit log next to the store file.
    pub fn closed_log(&self) -> JsonlLog<Position> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        JsonlLog::new(dir.join(CLOSED_LOG_FILE))
    }

    /// A missing file is an empty store.
    pub fn load(&self) -> Result<PositionStore, StoreError> {
        if !self.path.exists() {
            return Ok(PositionStore::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Writes the open book, then archives closed positions to the audit log.
    ///
    /// `store` keeps its closed positions until both steps succeed, so a
    /// failed save can simply be retried. Positions already in the log are
    /// not appended twice.
    pub fn save(&self, store: &mut PositionStore) -> Result<usize, StoreError> {
        let mut book = store.clone();
        let closed = book.take_closed();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&book).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;

        let log = self.closed_log();
        let logged: BTreeSet<PositionId> = if closed.is_empty() {
            BTreeSet::new()
        } else {
            let existing = log.read_all().map_err(|e| StoreError::io(log.path(), e))?;
            existing.iter().map(|p| p.id().clone()).collect()
        };
        let fresh: Vec<Position> = closed.iter().filter(|p| !logged.contains(p.id())).cloned().collect();
        log.append_all(&fresh).map_err(|e| StoreError::io(log.path(), e))?;
        *store = book;

        info!(
            path = %self.path.display(),
            open = store.open_count(),
            archived = closed.len(),
            "position store saved"
        );
        Ok(closed.len())
    }

    pub fn closed_history(&self) -> Result<Vec<Position>, StoreError> {
        let log = self.closed_log();
        log.read_all().map_err(|e| StoreError::io(log.path(), e))
    }
}
