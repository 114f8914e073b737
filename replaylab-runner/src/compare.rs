//! Side-by-side comparison of independent runs.
//!
//! Each configuration builds its own agent and position manager; nothing is
//! shared between runs except read-only inputs (bars, model registry).

use rayon::prelude::*;
use replaylab_core::domain::BarSeries;
use tracing::{info, warn};

use crate::config::RunFileConfig;
use crate::model_registry::ModelRegistry;
use crate::runner::{run_from_config, run_with_series, ReplayReport, RunError};

/// Run every config, each loading its own data. Output order matches input
/// order; a failing run does not abort the others.
pub fn compare_runs(
    configs: &[RunFileConfig],
    registry: Option<&ModelRegistry>,
    parallel: bool,
) -> Vec<Result<ReplayReport, RunError>> {
    info!(runs = configs.len(), parallel, "comparing runs");
    let results: Vec<_> = if parallel {
        configs
            .par_iter()
            .map(|config| run_from_config(config, registry))
            .collect()
    } else {
        configs.iter().map(|config| run_from_config(config, registry)).collect()
    };
    log_failures(&results);
    results
}

/// Run every config against the same pre-loaded bars. `[data]` sections are
/// ignored.
pub fn compare_on_series(
    configs: &[RunFileConfig],
    series: &BarSeries,
    registry: Option<&ModelRegistry>,
) -> Vec<Result<ReplayReport, RunError>> {
    let results: Vec<_> = configs
        .par_iter()
        .map(|config| run_with_series(config, series, registry, None))
        .collect();
    log_failures(&results);
    results
}

/// Index of the successful report with the highest return.
pub fn best_by_return(results: &[Result<ReplayReport, RunError>]) -> Option<usize> {
    results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.as_ref().ok().map(|report| (i, report.metrics.return_pct)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

fn log_failures(results: &[Result<ReplayReport, RunError>]) {
    for (i, r) in results.iter().enumerate() {
        if let Err(e) = r {
            warn!(run = i, error = %e, "run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, DataConfig, SyntheticConfig};
    use crate::data_loader::synthetic_series;
    use replaylab_core::agent::MomentumAgent;
    use replaylab_core::engine::ReplayConfig;

    fn config(lookback: usize, seed: u64) -> RunFileConfig {
        RunFileConfig {
            replay: ReplayConfig::new(10_000.0, 20),
            agent: AgentConfig::Momentum(MomentumAgent::new(lookback, 0.3)),
            data: DataConfig {
                synthetic: SyntheticConfig {
                    bars: 250,
                    seed,
                    ..SyntheticConfig::default()
                },
                ..DataConfig::default()
            },
            ..RunFileConfig::default()
        }
    }

    #[test]
    fn parallel_matches_sequential_in_order() {
        let configs = vec![config(5, 1), config(10, 2), config(20, 3)];
        let par = compare_runs(&configs, None, true);
        let seq = compare_runs(&configs, None, false);
        assert_eq!(par.len(), 3);
        for (p, s) in par.iter().zip(&seq) {
            let (p, s) = (p.as_ref().unwrap(), s.as_ref().unwrap());
            assert_eq!(p.run_id, s.run_id);
            assert_eq!(p.result.trades, s.result.trades);
            assert_eq!(p.result.equity_curve, s.result.equity_curve);
        }
        for (report, cfg) in par.iter().zip(&configs) {
            assert_eq!(report.as_ref().unwrap().run_id, cfg.run_id());
        }
    }

    #[test]
    fn failures_stay_in_their_slot() {
        let mut bad = config(5, 1);
        bad.replay.warmup_bars = 10_000;
        let results = compare_runs(&[config(5, 1), bad, config(7, 1)], None, true);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(RunError::Replay(_))));
        assert!(results[2].is_ok());
        assert_ne!(best_by_return(&results), Some(1));
    }

    #[test]
    fn shared_series_runs_are_isolated() {
        let series = synthetic_series("SYNTH", &SyntheticConfig { bars: 250, ..SyntheticConfig::default() }).unwrap();
        let configs = vec![config(5, 0), config(5, 0)];
        let results = compare_on_series(&configs, &series, None);
        let a = results[0].as_ref().unwrap();
        let b = results[1].as_ref().unwrap();
        assert_eq!(a.result.trades, b.result.trades);
        assert_eq!(a.result.final_equity, b.result.final_equity);
    }

    #[test]
    fn best_by_return_empty() {
        assert_eq!(best_by_return(&[]), None);
    }
}
