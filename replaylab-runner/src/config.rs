//! Serializable run configuration, loaded from TOML.
//!
//! A run file has four sections:
//!
//! ```toml
//! [replay]
//! initial_capital = 10000.0
//! leverage = 5.0
//! stop_loss_pct = 0.02
//! warmup_bars = 50
//!
//! [agent]
//! type = "momentum"
//! lookback = 10
//! threshold_pct = 1.0
//!
//! [data]
//! symbol = "BTCUSDT"
//! csv = "data/btc_1h.csv"
//!
//! [logging]
//! level = "info"
//! ```

use replaylab_core::agent::{MomentumAgent, OrderFlowAgent, PredictionPolicy, TrendZoneAgent};
use replaylab_core::engine::ReplayConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a run (content-addressable hash of its config).
pub type RunId = String;

/// Errors from reading or validating a run file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete, reproducible description of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunFileConfig {
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RunFileConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.replay
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.agent.validate()?;
        self.data.validate()
    }

    /// Deterministic hash of the canonical JSON form of this config.
    ///
    /// Two runs with identical configs share a RunId.
    pub fn run_id(&self) -> RunId {
        // Plain structs with string keys always serialize.
        let json = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

/// Which agent to build, and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentConfig {
    Momentum(MomentumAgent),

    OrderFlow(OrderFlowAgent),

    TrendZone(TrendZoneAgent),

    /// Probability model loaded from a file or from the registry.
    Ml {
        /// Explicit model file. Takes precedence over `model`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model_path: Option<PathBuf>,
        /// Registry entry name. Neither set means the registry's active model.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        #[serde(default)]
        policy: PredictionPolicy,
        #[serde(default = "default_min_bars")]
        min_bars: usize,
        /// Predict every bar once before the loop instead of per call.
        #[serde(default = "default_true")]
        precompute: bool,
    },

    Ensemble {
        members: Vec<EnsembleMember>,
        #[serde(default = "default_min_agreement")]
        min_agreement: f64,
    },
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig::Momentum(MomentumAgent::default())
    }
}

impl AgentConfig {
    /// Short label used in logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentConfig::Momentum(_) => "momentum",
            AgentConfig::OrderFlow(_) => "order_flow",
            AgentConfig::TrendZone(_) => "trend_zone",
            AgentConfig::Ml { .. } => "ml",
            AgentConfig::Ensemble { .. } => "ensemble",
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            AgentConfig::Momentum(m) if m.lookback == 0 => {
                Err(ConfigError::Invalid("momentum lookback must be at least 1".into()))
            }
            AgentConfig::TrendZone(t) if t.ema_fast == 0 || t.ema_slow == 0 || t.supertrend_period == 0 => {
                Err(ConfigError::Invalid("trend_zone periods must be at least 1".into()))
            }
            AgentConfig::Ml { policy, .. } if policy.sell_threshold > policy.buy_threshold => Err(
                ConfigError::Invalid(format!(
                    "ml sell_threshold {} exceeds buy_threshold {}",
                    policy.sell_threshold, policy.buy_threshold
                )),
            ),
            AgentConfig::Ensemble { members, min_agreement } => {
                if members.is_empty() {
                    return Err(ConfigError::Invalid("ensemble needs at least one member".into()));
                }
                if !(*min_agreement > 0.0 && *min_agreement <= 1.0) {
                    return Err(ConfigError::Invalid(format!(
                        "ensemble min_agreement must be in (0, 1], got {min_agreement}"
                    )));
                }
                for m in members {
                    if !(m.weight.is_finite() && m.weight > 0.0) {
                        return Err(ConfigError::Invalid(format!(
                            "ensemble member weight must be positive, got {}",
                            m.weight
                        )));
                    }
                    m.agent.validate()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// One weighted ensemble member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleMember {
    pub agent: AgentConfig,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_min_bars() -> usize {
    replaylab_core::agent::ml::DEFAULT_MIN_BARS
}

fn default_true() -> bool {
    true
}

fn default_min_agreement() -> f64 {
    0.5
}

fn default_weight() -> f64 {
    1.0
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub symbol: String,
    /// CSV file with `timestamp,open,high,low,close,volume`. When absent,
    /// synthetic bars are generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<PathBuf>,
    pub synthetic: SyntheticConfig,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbol: "SYNTH".to_string(),
            csv: None,
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl DataConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("data.symbol must not be empty".into()));
        }
        if self.csv.is_none() {
            self.synthetic.validate()?;
        }
        Ok(())
    }
}

/// Seeded random-walk parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub bars: usize,
    pub seed: u64,
    pub start_price: f64,
    /// Standard deviation of per-bar returns.
    pub volatility: f64,
    pub interval_minutes: i64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bars: 1_000,
            seed: 42,
            start_price: 100.0,
            volatility: 0.01,
            interval_minutes: 60,
        }
    }
}

impl SyntheticConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.start_price.is_finite() && self.start_price > 0.0) {
            return Err(ConfigError::Invalid("synthetic.start_price must be positive".into()));
        }
        if !(self.volatility.is_finite() && self.volatility >= 0.0 && self.volatility < 0.5) {
            return Err(ConfigError::Invalid("synthetic.volatility must be in [0, 0.5)".into()));
        }
        if self.interval_minutes <= 0 {
            return Err(ConfigError::Invalid("synthetic.interval_minutes must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Command-line overrides: an explicit level replaces the configured one,
    /// and JSON output is on if either side asks for it.
    pub fn with_overrides(&self, level: Option<&str>, json: bool) -> Self {
        Self {
            level: level.map_or_else(|| self.level.clone(), str::to_string),
            json: self.json || json,
        }
    }
}
