//! Domain types: price bars and series, universe candidates, identifiers, signals.

pub mod bar;
pub mod candidate;
pub mod ids;
pub mod series;
pub mod signal;

pub use bar::PriceBar;
pub use candidate::UniverseCandidate;
pub use ids::PositionId;
pub use series::PriceSeries;
pub use signal::{Direction, Signal};
