//! Replay runner: wires together data loading, agent construction, the
//! replay engine, and metrics.
//!
//! Two entry points:
//! - `run_from_config()`: loads bars per `[data]`, then runs. Used by the CLI.
//! - `run_with_series()`: takes pre-loaded bars. Used by tests and callers
//!   that replay many agents over one dataset.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use replaylab_core::agent::{
    Agent, AgentError, EnsembleAgent, MlAgent, MlPredictor, ModelError, PrecomputedAgent,
};
use replaylab_core::domain::BarSeries;
use replaylab_core::engine::{run_replay, CancelToken, ReplayError, ReplayResult};

use crate::config::{AgentConfig, ConfigError, RunFileConfig, RunId};
use crate::data_loader::{load_series, LoadError};
use crate::metrics::Metrics;
use crate::model_registry::{load_model_file, ModelRegistry, RegistryError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),
    #[error("ml agent needs a model_path or a model registry")]
    NoModelSource,
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Everything one run produced, plus the configuration that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub agent: String,
    pub config: RunFileConfig,
    pub result: ReplayResult,
    pub metrics: Metrics,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Build the agent described by `config`.
///
/// Precomputing ML agents are prepared against `series` here, before the
/// replay starts, so the loop itself only does index lookups.
pub fn build_agent(
    config: &AgentConfig,
    series: &BarSeries,
    registry: Option<&ModelRegistry>,
) -> Result<Box<dyn Agent>, RunError> {
    let agent: Box<dyn Agent> = match config {
        AgentConfig::Momentum(a) => Box::new(a.clone()),
        AgentConfig::OrderFlow(a) => Box::new(a.clone()),
        AgentConfig::TrendZone(a) => Box::new(a.clone()),
        AgentConfig::Ml {
            model_path,
            model,
            policy,
            min_bars,
            precompute,
        } => {
            let (loaded, label) = match (model_path, model, registry) {
                (Some(path), _, _) => (load_model_file(path)?, "ml".to_string()),
                (None, Some(name), Some(reg)) => (reg.load(name)?, name.clone()),
                (None, None, Some(reg)) => {
                    let name = reg.active().map_or_else(|| "ml".to_string(), |m| m.name.clone());
                    (reg.load_active()?, name)
                }
                (None, _, None) => return Err(RunError::NoModelSource),
            };
            let predictor = MlPredictor::new(loaded)?
                .with_min_bars(*min_bars)
                .with_name(label);
            if *precompute {
                Box::new(PrecomputedAgent::prepare(&predictor, series, *policy)?)
            } else {
                Box::new(MlAgent::new(predictor, *policy))
            }
        }
        AgentConfig::Ensemble { members, min_agreement } => {
            let mut ensemble = EnsembleAgent::new("ensemble").with_min_agreement(*min_agreement);
            for member in members {
                ensemble = ensemble.with_member(build_agent(&member.agent, series, registry)?, member.weight);
            }
            Box::new(ensemble)
        }
    };
    Ok(agent)
}

/// Load data per `config.data`, then run.
pub fn run_from_config(
    config: &RunFileConfig,
    registry: Option<&ModelRegistry>,
) -> Result<ReplayReport, RunError> {
    config.validate()?;
    let series = load_series(&config.data)?;
    run_with_series(config, &series, registry, None)
}

/// Run with pre-loaded bars: no data I/O.
pub fn run_with_series(
    config: &RunFileConfig,
    series: &BarSeries,
    registry: Option<&ModelRegistry>,
    cancel: Option<&CancelToken>,
) -> Result<ReplayReport, RunError> {
    let run_id = config.run_id();
    let agent = build_agent(&config.agent, series, registry)?;
    info!(run_id = %short_id(&run_id), agent = agent.name(), symbol = series.symbol(), "starting run");

    let result = run_replay(series, agent.as_ref(), &config.replay, cancel)?;
    let metrics = Metrics::compute(&result.trades, &result.equity_curve, result.initial_capital);

    info!(
        run_id = %short_id(&run_id),
        trades = metrics.total_trades,
        return_pct = metrics.return_pct,
        "run finished"
    );

    Ok(ReplayReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        agent: agent.name().to_string(),
        config: config.clone(),
        result,
        metrics,
    })
}

/// First 12 hex chars of a run id; used in logs and artifact directories.
pub fn short_id(run_id: &str) -> &str {
    run_id.get(..12).unwrap_or(run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, EnsembleMember, SyntheticConfig};
    use crate::data_loader::synthetic_series;
    use replaylab_core::agent::{MomentumAgent, OrderFlowAgent, PredictionPolicy};
    use replaylab_core::engine::ReplayConfig;

    fn config(agent: AgentConfig) -> RunFileConfig {
        RunFileConfig {
            replay: ReplayConfig::new(10_000.0, 30),
            agent,
            data: DataConfig {
                synthetic: SyntheticConfig {
                    bars: 300,
                    ..SyntheticConfig::default()
                },
                ..DataConfig::default()
            },
            ..RunFileConfig::default()
        }
    }

    #[test]
    fn momentum_run_from_config() {
        let cfg = config(AgentConfig::Momentum(MomentumAgent::new(10, 0.5)));
        let report = run_from_config(&cfg, None).unwrap();
        assert_eq!(report.result.equity_curve.len(), 300);
        assert_eq!(report.metrics.total_trades, report.result.trades.len());
        assert_eq!(report.run_id, cfg.run_id());
        assert_eq!(report.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn same_config_same_report() {
        let cfg = config(AgentConfig::Momentum(MomentumAgent::new(5, 0.2)));
        let a = run_from_config(&cfg, None).unwrap();
        let b = run_from_config(&cfg, None).unwrap();
        assert_eq!(a.result.trades, b.result.trades);
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn ensemble_builds_every_member() {
        let cfg = config(AgentConfig::Ensemble {
            members: vec![
                EnsembleMember {
                    agent: AgentConfig::Momentum(MomentumAgent::default()),
                    weight: 2.0,
                },
                EnsembleMember {
                    agent: AgentConfig::OrderFlow(OrderFlowAgent::default()),
                    weight: 1.0,
                },
            ],
            min_agreement: 0.5,
        });
        let series = synthetic_series("SYNTH", &cfg.data.synthetic).unwrap();
        let report = run_with_series(&cfg, &series, None, None).unwrap();
        assert_eq!(report.agent, "ensemble");
    }

    #[test]
    fn ml_without_model_source_is_an_error() {
        let cfg = config(AgentConfig::Ml {
            model_path: None,
            model: None,
            policy: PredictionPolicy::default(),
            min_bars: 60,
            precompute: true,
        });
        assert!(matches!(run_from_config(&cfg, None), Err(RunError::NoModelSource)));
    }

    #[test]
    fn warmup_longer_than_data_is_reported() {
        let mut cfg = config(AgentConfig::default());
        cfg.replay.warmup_bars = 1_000;
        assert!(matches!(
            run_from_config(&cfg, None),
            Err(RunError::Replay(ReplayError::InsufficientHistory { required: 1_000, available: 300 }))
        ));
    }

    #[test]
    fn cancelled_run_reports_partial_result() {
        let cfg = config(AgentConfig::default());
        let series = synthetic_series("SYNTH", &cfg.data.synthetic).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let report = run_with_series(&cfg, &series, None, Some(&token)).unwrap();
        assert!(report.result.cancelled);
        assert!(report.result.equity_curve.is_empty());
    }

    #[test]
    fn short_id_truncates() {
        assert_eq!(short_id("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_id("abc"), "abc");
    }
}
