//! Position lifecycle: sizing, the PENDING → OPEN → CLOSED state machine,
//! and per-cycle exit evaluation against an injected store.

pub mod exits;
pub mod manager;
pub mod position;
pub mod sizing;
pub mod state;
pub mod store;

pub use exits::{
    ExitParams, ExitPolicy, ExitRule, ExitTrigger, PositionObservation, RiskCause, RiskEventExit, StopLossExit,
    TakeProfitExit, TakeProfitMode, TimeStopExit,
};
pub use manager::{ExitEvent, LifecycleManager};
pub use position::{ExitRecord, PartialExit, PendingPosition, Position};
pub use sizing::{SizingDecision, SizingParams};
pub use state::PositionState;
pub use store::PositionStore;
