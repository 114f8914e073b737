//! ReplayLab Runner: run orchestration, model registry, metrics, export.
//!
//! This crate builds on `replaylab-core` to provide:
//! - TOML run files and content-addressed run ids
//! - CSV and seeded synthetic bar loading
//! - Agent construction from configuration
//! - Model registry with an explicit load/activate lifecycle
//! - Performance metrics and JSON/CSV artifacts
//! - Parallel comparison of independent runs

pub mod compare;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod model_registry;
pub mod runner;
pub mod telemetry;

pub use compare::{best_by_return, compare_on_series, compare_runs};
pub use config::{AgentConfig, ConfigError, DataConfig, EnsembleMember, LoggingConfig, RunFileConfig, RunId, SyntheticConfig};
pub use data_loader::{load_csv, load_series, read_csv, synthetic_series, LoadError};
pub use export::{load_artifacts, save_artifacts, summary_line};
pub use metrics::Metrics;
pub use model_registry::{ModelEntry, ModelRegistry, RegistryError};
pub use runner::{build_agent, run_from_config, run_with_series, ReplayReport, RunError};
pub use telemetry::{init_logging, LogFormat};
