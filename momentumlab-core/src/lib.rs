//! MomentumLab Core: the signal and options strategy engine.
//!
//! Everything here is a pure, synchronous computation over an immutable
//! snapshot:
//! - Universe ranking and long/short momentum scores
//! - Black-Scholes pricing with Greeks, implied volatility
//! - Delta-targeted strike solving with a hard iteration ceiling
//! - Put / put-spread construction behind a volatility guard
//! - Entry scoring (ENTER / WAIT / REJECT)
//! - Position sizing and the lifecycle state machine
//!
//! The only mutable state is the [`lifecycle::PositionStore`], which callers
//! own and pass in explicitly.

pub mod domain;
pub mod entry;
pub mod error;
pub mod indicators;
pub mod lifecycle;
pub mod momentum;
pub mod pricing;
pub mod solver;
pub mod strategy;
pub mod universe;

pub use error::{EngineError, EngineResult};
