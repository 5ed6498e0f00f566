use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::Position;
use crate::domain::PositionId;

/// Registry of open positions plus closed history.
///
/// Passed explicitly into each cycle; mutation goes through `&mut`, so one
/// exit pass is the only writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionStore {
    open: BTreeMap<PositionId, Position>,
    #[serde(default)]
    closed: Vec<Position>,
    /// Monotonic counter feeding position ids.
    #[serde(default)]
    sequence: u64,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.open.values()
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn get(&self, id: &PositionId) -> Option<&Position> {
        self.open.get(id)
    }

    pub fn closed(&self) -> &[Position] {
        &self.closed
    }

    pub fn open_tickers(&self) -> BTreeSet<&str> {
        self.open.values().map(Position::ticker).collect()
    }

    pub fn has_open(&self, ticker: &str) -> bool {
        self.open.values().any(|p| p.ticker() == ticker)
    }

    /// Capital at risk across all open positions.
    pub fn committed_risk(&self) -> f64 {
        self.open.values().map(Position::committed_risk).sum()
    }

    /// Drains the closed history, leaving the open book untouched.
    pub fn take_closed(&mut self) -> Vec<Position> {
        std::mem::take(&mut self.closed)
    }

    pub(crate) fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    pub(crate) fn insert(&mut self, position: Position) {
        self.open.insert(position.id().clone(), position);
    }

    pub(crate) fn open_ids(&self) -> Vec<PositionId> {
        self.open.keys().cloned().collect()
    }

    pub(crate) fn get_mut(&mut self, id: &PositionId) -> Option<&mut Position> {
        self.open.get_mut(id)
    }

    /// Moves a no-longer-open position into the closed history.
    pub(crate) fn archive(&mut self, id: &PositionId) {
        if let Some(position) = self.open.remove(id) {
            self.closed.push(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::position::tests::open_position;

    #[test]
    fn committed_risk_sums_open_positions() {
        let mut store = PositionStore::new();
        store.insert(open_position(2.0));
        // 2.0 · 100 · 4 contracts
        assert!((store.committed_risk() - 800.0).abs() < 1e-9);
        assert!(store.has_open("XYZ"));
        assert!(!store.has_open("ABC"));
    }

    #[test]
    fn sequence_is_monotonic() {
        let mut store = PositionStore::new();
        assert_eq!(store.next_sequence(), 1);
        assert_eq!(store.next_sequence(), 2);
    }

    #[test]
    fn json_roundtrip_keeps_keys() {
        let mut store = PositionStore::new();
        store.insert(open_position(2.0));
        let json = serde_json::to_string(&store).unwrap();
        let back: PositionStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back.open_count(), 1);
        assert!(back.get(&PositionId("test".into())).is_some());
    }
}
