use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique position identifier.
///
/// Derived with BLAKE3 over a canonical JSON rendering of the position's
/// opening facts plus a store-local sequence number, so two positions on the
/// same ticker and date still get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionId(pub String);

impl PositionId {
    pub fn derive(ticker: &str, entry_date: NaiveDate, strikes: &[f64], sequence: u64) -> Self {
        use serde_json::json;

        let canonical = json!({
            "entry_date": entry_date.to_string(),
            "sequence": sequence,
            "strikes": strikes.iter().map(|k| format!("{k:.4}")).collect::<Vec<_>>(),
            "ticker": ticker,
        });
        let hash = blake3::hash(canonical.to_string().as_bytes());
        Self(hash.to_hex()[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[test]
    fn derive_is_deterministic() {
        let a = PositionId::derive("XYZ", date(), &[95.0, 85.0], 1);
        let b = PositionId::derive("XYZ", date(), &[95.0, 85.0], 1);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn sequence_disambiguates() {
        let a = PositionId::derive("XYZ", date(), &[95.0], 1);
        let b = PositionId::derive("XYZ", date(), &[95.0], 2);
        assert_ne!(a, b);
    }
}
