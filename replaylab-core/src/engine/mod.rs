//! Replay engine: position state machine, per-bar loop, ledger and equity curve.
//!
//! A run owns all of its mutable state. Nothing here is shared between runs,
//! so independent replays can execute on separate threads without locking.

pub mod accounting;
pub mod cancel;
pub mod error;
pub mod loop_runner;
pub mod position_manager;
pub mod state;
pub mod warmup;

pub use accounting::{EquityCurve, TradeLedger};
pub use cancel::CancelToken;
pub use error::ReplayError;
pub use loop_runner::run_replay;
pub use position_manager::{PositionManager, Transition};
pub use state::{DecisionRecord, ReplayConfig, ReplayResult};
pub use warmup::WarmupGate;
