//! The Agent contract and its variants.
//!
//! An agent turns a causal window of bars plus caller-supplied context into a
//! `Decision`. Agents never see the full series: the engine only hands them a
//! `LookbackView`, and `AgentContext` is derived from that same window.
//!
//! Variants are selected by explicit construction:
//! - rule-based: `MomentumAgent`, `OrderFlowAgent`, `TrendZoneAgent`
//! - model-driven: `MlAgent` (direct) and `PrecomputedAgent` (lookup)
//! - composite: `EnsembleAgent`
//! - scripted: `ScheduledAgent`

pub mod audit;
pub mod context;
pub mod ensemble;
pub mod ml;
pub mod model;
pub mod policy;
pub mod precomputed;
pub mod rule_based;
pub mod scheduled;

pub use audit::{audit_prefix_stability, CausalityViolation};
pub use context::{AgentContext, OrderFlow};
pub use ensemble::EnsembleAgent;
pub use ml::{MlAgent, MlPredictor, SeriesPredictor};
pub use model::{LinearModel, ModelError, ProbabilityModel};
pub use policy::PredictionPolicy;
pub use precomputed::PrecomputedAgent;
pub use rule_based::{MomentumAgent, OrderFlowAgent, TrendZoneAgent};
pub use scheduled::ScheduledAgent;

use crate::domain::{Decision, LookbackView};
use thiserror::Error;

/// Failure inside an agent. The engine treats every error as HOLD.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("prediction unavailable at bar {index}: {reason}")]
    Unavailable { index: usize, reason: String },

    #[error("{0}")]
    Other(String),
}

/// A pluggable decision maker.
///
/// `analyze` must be a pure function of `window` and `context`: it may not
/// look at bars past `window.current()`. Agents are shared across threads by
/// reference, so any internal caching must be internally synchronised.
pub trait Agent: Send + Sync {
    /// Stable identifier used in logs and reports.
    fn name(&self) -> &str;

    fn analyze(&self, window: LookbackView<'_>, context: &AgentContext) -> Result<Decision, AgentError>;
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn analyze(&self, window: LookbackView<'_>, context: &AgentContext) -> Result<Decision, AgentError> {
        (**self).analyze(window, context)
    }
}
