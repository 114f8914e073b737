//! ReplayLab Core: bar series, agent contract, position state machine, replay loop.
//!
//! This crate contains the simulation engine:
//! - Domain types (bars, decisions, positions, trades, equity points)
//! - Causally-bounded lookback views over a bar series
//! - The `Agent` contract with rule-based, model-driven, ensemble and scheduled variants
//! - Causal indicators and feature engineering
//! - Single-position state machine with leverage, margin, commission and protective exits
//! - Bar-by-bar replay loop with cooperative cancellation
//!
//! Pure computation: no file or network I/O, no logging subscriber.

pub mod agent;
pub mod domain;
pub mod engine;
pub mod features;
pub mod indicators;

pub use agent::{Agent, AgentContext, AgentError};
pub use domain::{Action, Bar, BarSeries, Decision, EquityPoint, ExitReason, LookbackView, Position, PositionSide, Trade};
pub use engine::{run_replay, CancelToken, ReplayConfig, ReplayError, ReplayResult};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a parallel comparison moves across
    /// threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::BarSeries>();
        require_sync::<domain::BarSeries>();
        require_send::<domain::Decision>();
        require_sync::<domain::Decision>();
        require_send::<domain::Position>();
        require_sync::<domain::Position>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();
        require_send::<domain::EquityPoint>();
        require_sync::<domain::EquityPoint>();

        // Engine types
        require_send::<engine::ReplayConfig>();
        require_sync::<engine::ReplayConfig>();
        require_send::<engine::ReplayResult>();
        require_sync::<engine::ReplayResult>();
        require_send::<engine::CancelToken>();
        require_sync::<engine::CancelToken>();
        require_send::<engine::PositionManager>();
        require_sync::<engine::PositionManager>();

        // Agents
        require_send::<Box<dyn agent::Agent>>();
        require_sync::<Box<dyn agent::Agent>>();
        require_send::<agent::MomentumAgent>();
        require_sync::<agent::MomentumAgent>();
        require_send::<agent::OrderFlowAgent>();
        require_sync::<agent::OrderFlowAgent>();
        require_send::<agent::TrendZoneAgent>();
        require_sync::<agent::TrendZoneAgent>();
        require_send::<agent::MlAgent>();
        require_sync::<agent::MlAgent>();
        require_send::<agent::PrecomputedAgent>();
        require_sync::<agent::PrecomputedAgent>();
        require_send::<agent::EnsembleAgent>();
        require_sync::<agent::EnsembleAgent>();
        require_send::<agent::ScheduledAgent>();
        require_sync::<agent::ScheduledAgent>();
    }

    /// Architecture contract: `Agent::analyze` receives a `LookbackView`, not
    /// the series, and `LookbackView` has no way to reach past its last bar.
    ///
    /// If someone adds a `&BarSeries` parameter, this stops compiling.
    #[test]
    fn agent_trait_takes_only_a_lookback_view() {
        fn _check_trait_object_builds(
            agent: &dyn agent::Agent,
            series: &domain::BarSeries,
            context: &agent::AgentContext,
        ) -> Option<Result<domain::Decision, agent::AgentError>> {
            series.window(0).map(|w| agent.analyze(w, context))
        }
    }

    /// Architecture contract: `AgentContext` exposes the position side only.
    #[test]
    fn agent_context_carries_no_cash_or_equity() {
        let agent::AgentContext {
            order_flow: _,
            position: _,
        } = agent::AgentContext::default();
    }
}
