use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the market a strategy expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

/// Signal emitted for a ranked ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Enter,
    EnterShort,
    Exit,
}

impl Signal {
    /// The entry signal for a direction.
    pub fn entry_for(direction: Direction) -> Self {
        match direction {
            Direction::Long => Self::Enter,
            Direction::Short => Self::EnterShort,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => write!(f, "ENTER"),
            Self::EnterShort => write!(f, "ENTER_SHORT"),
            Self::Exit => write!(f, "EXIT"),
        }
    }
}
