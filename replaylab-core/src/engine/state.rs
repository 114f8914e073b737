//! Replay configuration and result types.

use super::error::ReplayError;
use crate::domain::{Decision, EquityPoint, Position, PositionSide, Trade};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration for a single replay run. Percentages are fractions (0.05 = 5%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub initial_capital: f64,
    /// Notional multiplier over margin. Must be >= 1.
    pub leverage: f64,
    /// Fraction of equity committed as margin per entry.
    pub position_size_pct: f64,
    /// Fraction of notional charged on entry and again on exit.
    pub commission_rate: f64,
    pub stop_loss_pct: Option<f64>,
    pub take_profit_pct: Option<f64>,
    /// Bars of history required before the agent is consulted.
    pub warmup_bars: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            leverage: 1.0,
            position_size_pct: 0.95,
            commission_rate: 0.001,
            stop_loss_pct: None,
            take_profit_pct: None,
            warmup_bars: 50,
        }
    }
}

impl ReplayConfig {
    pub fn new(initial_capital: f64, warmup_bars: usize) -> Self {
        Self {
            initial_capital,
            warmup_bars,
            ..Self::default()
        }
    }

    pub fn with_leverage(mut self, leverage: f64) -> Self {
        self.leverage = leverage;
        self
    }

    pub fn with_position_size_pct(mut self, pct: f64) -> Self {
        self.position_size_pct = pct;
        self
    }

    pub fn with_commission_rate(mut self, rate: f64) -> Self {
        self.commission_rate = rate;
        self
    }

    pub fn with_stop_loss_pct(mut self, pct: f64) -> Self {
        self.stop_loss_pct = Some(pct);
        self
    }

    pub fn with_take_profit_pct(mut self, pct: f64) -> Self {
        self.take_profit_pct = Some(pct);
        self
    }

    pub fn validate(&self) -> Result<(), ReplayError> {
        let invalid = |msg: String| Err(ReplayError::InvalidConfig(msg));

        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return invalid(format!("initial_capital must be positive, got {}", self.initial_capital));
        }
        if !(self.leverage.is_finite() && self.leverage >= 1.0) {
            return invalid(format!("leverage must be >= 1, got {}", self.leverage));
        }
        if !(self.position_size_pct > 0.0 && self.position_size_pct <= 1.0) {
            return invalid(format!(
                "position_size_pct must be in (0, 1], got {}",
                self.position_size_pct
            ));
        }
        if !(self.commission_rate.is_finite() && (0.0..1.0).contains(&self.commission_rate)) {
            return invalid(format!("commission_rate must be in [0, 1), got {}", self.commission_rate));
        }
        if let Some(sl) = self.stop_loss_pct {
            if !(sl > 0.0 && sl < 1.0) {
                return invalid(format!("stop_loss_pct must be in (0, 1), got {sl}"));
            }
        }
        if let Some(tp) = self.take_profit_pct {
            if !(tp.is_finite() && tp > 0.0) {
                return invalid(format!("take_profit_pct must be positive, got {tp}"));
            }
        }
        Ok(())
    }
}

/// A non-HOLD decision and what the engine made of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    /// Close of the bar the decision was applied at.
    pub price: f64,
    pub decision: Decision,
    /// Position side after the decision was applied (`None` = flat).
    pub position_after: Option<PositionSide>,
}

/// Output of one replay run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayResult {
    pub symbol: String,
    pub agent: String,
    pub initial_capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub decisions: Vec<DecisionRecord>,
    pub final_equity: f64,

    // ── Diagnostics ──
    /// Bars in the input series.
    pub bar_count: usize,
    pub warmup_bars: usize,
    /// Bars skipped for non-finite prices.
    pub invalid_bars: usize,
    /// Agent errors and malformed decisions coerced to HOLD.
    pub malformed_decisions: usize,
    pub cancelled: bool,
    /// Position still open when a run was cancelled.
    pub open_position: Option<Position>,
}

impl ReplayResult {
    /// Bars fully processed (equals `bar_count` unless cancelled).
    pub fn bars_processed(&self) -> usize {
        self.equity_curve.len()
    }

    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }
}
