//! Errors that abort a replay before the loop starts.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    #[error("insufficient history: {required} warmup bars required, {available} available")]
    InsufficientHistory { required: usize, available: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
