//! ReplayLab CLI: run, compare, and model registry commands.
//!
//! Commands:
//! - `run`: replay one agent from a TOML run file and save artifacts
//! - `compare`: run several run files in parallel and print one row each
//! - `models list|register|activate|remove`: manage the model registry

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use replaylab_runner::export::summary_line;
use replaylab_runner::telemetry::init_from_config;
use replaylab_runner::{
    best_by_return, compare_runs, run_from_config, save_artifacts, LoggingConfig, Metrics,
    ModelRegistry, ReplayReport, RunFileConfig,
};

#[derive(Parser)]
#[command(name = "replaylab", about = "ReplayLab CLI: bar-by-bar agent replay")]
struct Cli {
    /// Log level (overridden by RUST_LOG). Defaults to the run file's [logging] level.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one agent from a TOML run file.
    Run {
        /// Path to a TOML run file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Model registry directory (for `type = "ml"` agents).
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,
    },
    /// Run several run files side by side.
    Compare {
        /// Run files to compare (repeat the flag).
        #[arg(long = "config", required = true)]
        configs: Vec<PathBuf>,

        /// Model registry directory.
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,

        /// Run one at a time instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Model registry management.
    Models {
        /// Registry directory.
        #[arg(long, default_value = "models")]
        dir: PathBuf,

        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// List registered models, newest first.
    List {
        /// Print the registry entries as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Copy a model file into the registry.
    Register {
        name: String,
        path: PathBuf,
        #[arg(long)]
        description: Option<String>,
    },
    /// Make a registered model the active one.
    Activate { name: String },
    /// Delete a registered model and its file.
    Remove { name: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            models_dir,
        } => {
            let run_config = RunFileConfig::from_file(&config)?;
            init_from_config(&run_config.logging.with_overrides(cli.log_level.as_deref(), cli.json_logs))?;
            run_cmd(&run_config, &output_dir, &models_dir)
        }
        Commands::Compare {
            configs,
            models_dir,
            sequential,
        } => {
            init_from_config(&quiet_logging().with_overrides(cli.log_level.as_deref(), cli.json_logs))?;
            compare_cmd(&configs, &models_dir, !sequential)
        }
        Commands::Models { dir, action } => {
            init_from_config(&quiet_logging().with_overrides(cli.log_level.as_deref(), cli.json_logs))?;
            models_cmd(&dir, action)
        }
    }
}

/// Commands without a run file only log warnings unless asked otherwise.
fn quiet_logging() -> LoggingConfig {
    LoggingConfig {
        level: "warn".to_string(),
        json: false,
    }
}

/// The registry is only opened when the directory already exists, so plain
/// rule-based runs never create a `models/` directory as a side effect.
fn open_registry_if_present(dir: &Path) -> Result<Option<ModelRegistry>> {
    if !dir.is_dir() {
        return Ok(None);
    }
    let registry = ModelRegistry::open(dir)
        .with_context(|| format!("failed to open model registry at {}", dir.display()))?;
    Ok(Some(registry))
}

fn run_cmd(config: &RunFileConfig, output_dir: &Path, models_dir: &Path) -> Result<()> {
    let registry = open_registry_if_present(models_dir)?;
    let report = run_from_config(config, registry.as_ref())?;

    print_summary(&report);

    let run_dir = save_artifacts(&report, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn compare_cmd(paths: &[PathBuf], models_dir: &Path, parallel: bool) -> Result<()> {
    let configs = paths
        .iter()
        .map(|p| RunFileConfig::from_file(p).with_context(|| format!("loading {}", p.display())))
        .collect::<Result<Vec<_>>>()?;
    let registry = open_registry_if_present(models_dir)?;
    let results = compare_runs(&configs, registry.as_ref(), parallel);
    let best = best_by_return(&results);

    println!("{:<32} {}", "config", "result");
    println!("{}", "-".repeat(120));
    for (i, (path, result)) in paths.iter().zip(&results).enumerate() {
        let marker = if Some(i) == best { "*" } else { " " };
        match result {
            Ok(report) => println!("{marker}{:<31} {}", display_name(path), summary_line(report)),
            Err(e) => println!("{marker}{:<31} FAILED: {e}", display_name(path)),
        }
    }

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed == results.len() {
        bail!("all {failed} runs failed");
    }
    Ok(())
}

fn models_cmd(dir: &Path, action: ModelAction) -> Result<()> {
    let mut registry = ModelRegistry::open(dir)
        .with_context(|| format!("failed to open model registry at {}", dir.display()))?;

    match action {
        ModelAction::List { json } => {
            let entries = registry.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            if entries.is_empty() {
                println!("No models registered in {}", dir.display());
                return Ok(());
            }
            let active = registry.active().map(|m| m.name.clone());
            println!("{:<2}{:<24} {:<20} {:>8} {:>8}", "", "Name", "Created", "Features", "Classes");
            println!("{}", "-".repeat(66));
            for m in entries {
                let marker = if active.as_deref() == Some(m.name.as_str()) { "*" } else { "" };
                println!(
                    "{:<2}{:<24} {:<20} {:>8} {:>8}",
                    marker,
                    m.name,
                    m.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    m.feature_count,
                    m.classes
                );
            }
        }
        ModelAction::Register {
            name,
            path,
            description,
        } => {
            let used = registry.register(&name, &path, description)?;
            if used != name {
                println!("Name '{name}' was taken; registered as '{used}'");
            } else {
                println!("Registered '{used}'");
            }
        }
        ModelAction::Activate { name } => {
            registry.activate(&name)?;
            println!("Active model: {name}");
        }
        ModelAction::Remove { name } => {
            registry.remove(&name)?;
            match registry.active() {
                Some(m) => println!("Removed '{name}'; active model: {}", m.name),
                None => println!("Removed '{name}'; no active model"),
            }
        }
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_summary(report: &ReplayReport) {
    let r = &report.result;
    let m: &Metrics = &report.metrics;

    println!("Run {}: {} on {}", report.run_id, report.agent, r.symbol);
    println!(
        "Bars: {} ({} warmup, {} invalid)  Decisions: {}  Malformed: {}",
        r.bar_count,
        r.warmup_bars,
        r.invalid_bars,
        r.decisions.len(),
        r.malformed_decisions
    );
    if r.cancelled {
        println!("Run was cancelled; open position: {:?}", r.open_position.as_ref().map(|p| p.side));
    }
    println!();
    println!("{:<22} {:>14}", "Metric", "Value");
    println!("{}", "-".repeat(37));
    println!("{:<22} {:>14.2}", "Initial capital", r.initial_capital);
    println!("{:<22} {:>14.2}", "Final equity", m.final_equity);
    println!("{:<22} {:>13.2}%", "Return", m.return_pct);
    println!("{:<22} {:>13.2}%", "Max drawdown", m.max_drawdown_pct);
    println!("{:<22} {:>14.3}", "Sharpe", m.sharpe_ratio);
    println!("{:<22} {:>14.2}", "Profit factor", m.profit_factor);
    println!("{:<22} {:>14}", "Trades", m.total_trades);
    println!("{:<22} {:>13.1}%", "Win rate", m.win_rate_pct);
    println!("{:<22} {:>14.2}", "Avg win", m.avg_win);
    println!("{:<22} {:>14.2}", "Avg loss", m.avg_loss);
    println!("{:<22} {:>14.2}", "Commission", m.total_commission);
    for (reason, count) in &m.exits {
        println!("{:<22} {:>14}", format!("Exits ({reason})"), count);
    }
    info!(run_id = %report.run_id, "summary printed");
}
