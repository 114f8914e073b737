//! Performance metrics: pure functions over a trade list and equity curve.
//!
//! Every metric is derived solely from `Trade`s and `EquityPoint`s. No
//! dependencies on the runner, data loading, or the replay loop.

use replaylab_core::domain::{EquityPoint, ExitReason, Trade};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0;

/// Aggregate statistics for one replay run. Percentages are in percent units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub return_pct: f64,
    pub win_rate_pct: f64,
    /// Largest peak-to-trough decline, as a positive percentage.
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub profit_factor: f64,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub total_pnl: f64,
    pub total_commission: f64,
    pub final_equity: f64,
    pub max_consecutive_losses: usize,
    /// Closed trades per exit reason.
    pub exits: BTreeMap<ExitReason, usize>,
}

impl Metrics {
    pub fn compute(trades: &[Trade], equity: &[EquityPoint], initial_capital: f64) -> Self {
        let final_equity = equity.last().map_or(initial_capital, |p| p.equity);
        let wins: Vec<f64> = trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl).collect();
        let losses: Vec<f64> = trades.iter().filter(|t| !t.is_winner()).map(|t| t.pnl).collect();

        let mut exits = BTreeMap::new();
        for t in trades {
            *exits.entry(t.exit_reason).or_insert(0) += 1;
        }

        Self {
            return_pct: return_pct(final_equity, initial_capital),
            win_rate_pct: win_rate_pct(trades),
            max_drawdown_pct: max_drawdown_pct(equity),
            sharpe_ratio: sharpe_ratio(equity),
            profit_factor: profit_factor(trades),
            total_trades: trades.len(),
            wins: wins.len(),
            losses: losses.len(),
            avg_win: mean_f64(&wins),
            avg_loss: mean_f64(&losses),
            total_pnl: trades.iter().map(|t| t.pnl).sum(),
            total_commission: trades.iter().map(|t| t.total_commission()).sum(),
            final_equity,
            max_consecutive_losses: max_consecutive_losses(trades),
            exits,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn return_pct(final_equity: f64, initial_capital: f64) -> f64 {
    if initial_capital <= 0.0 {
        return 0.0;
    }
    (final_equity - initial_capital) / initial_capital * 100.0
}

/// Share of trades with positive pnl. Break-even trades count as losses.
pub fn win_rate_pct(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    winners as f64 / trades.len() as f64 * 100.0
}

/// Maximum drawdown as a positive percentage (15.0 = 15% below the peak).
///
/// Returns 0.0 if equity never falls below a previous peak.
pub fn max_drawdown_pct(equity: &[EquityPoint]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for p in equity {
        peak = peak.max(p.equity);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - p.equity) / peak);
        }
    }
    max_dd * 100.0
}

/// Annualised Sharpe ratio of per-bar equity returns (zero risk-free rate).
///
/// Bars per year come from the median bar interval over a 365-day year.
/// Returns 0.0 with fewer than 2 returns or zero variance.
pub fn sharpe_ratio(equity: &[EquityPoint]) -> f64 {
    let values: Vec<f64> = equity.iter().map(|p| p.equity).collect();
    let returns = bar_returns(&values);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    let Some(interval) = median_interval_secs(equity) else {
        return 0.0;
    };
    let periods_per_year = SECONDS_PER_YEAR / interval;
    mean_f64(&returns) / std * periods_per_year.sqrt()
}

/// Gross profit over gross loss.
///
/// Capped at 100.0 (all winners, zero losses). 0.0 with no trades.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.pnl < 0.0).map(|t| -t.pnl).sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub fn max_consecutive_losses(trades: &[Trade]) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() {
            current = 0;
        } else {
            current += 1;
            max_streak = max_streak.max(current);
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Simple returns between consecutive equity values.
pub fn bar_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn median_interval_secs(equity: &[EquityPoint]) -> Option<f64> {
    let mut gaps: Vec<f64> = equity
        .windows(2)
        .map(|w| (w[1].timestamp - w[0].timestamp).num_milliseconds() as f64 / 1000.0)
        .filter(|g| *g > 0.0)
        .collect();
    if gaps.is_empty() {
        return None;
    }
    gaps.sort_by(f64::total_cmp);
    Some(gaps[gaps.len() / 2])
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
