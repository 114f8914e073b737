//! Relative Strength Index (RSI).
//!
//! `Rsi` uses Wilder smoothing seeded by the simple average of the first
//! `period` changes. `rsi_ewm` is the span-smoothed variant used as a model
//! feature; it is defined from the second bar and reads 50 when undefined.

use super::{atr::wilder_smooth, closes, ema::ewm, ema::EwmMode, Indicator};
use crate::domain::Bar;

/// Wilder RSI. Lookback equals the period; a period of 0 is treated as 1.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let (gains, losses) = split_changes(&closes(bars));
        let avg_gain = wilder_smooth(&gains, self.period);
        let avg_loss = wilder_smooth(&losses, self.period);
        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| {
                if g.is_nan() || l.is_nan() {
                    f64::NAN
                } else {
                    rsi_from_averages(g, l)
                }
            })
            .collect()
    }
}

/// Per-bar gains and losses (both non-negative). Index 0 and any change
/// touching a non-finite value are NaN.
fn split_changes(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let changes = diff(values);
    let gains = changes.iter().map(|&c| if c.is_nan() { c } else { c.max(0.0) }).collect();
    let losses = changes.iter().map(|&c| if c.is_nan() { c } else { (-c).max(0.0) }).collect();
    (gains, losses)
}

/// RSI from span-smoothed gains and losses. Undefined points read 50.
pub fn rsi_ewm(values: &[f64], period: usize) -> Vec<f64> {
    let (gains, losses) = split_changes(values);
    let avg_gain = ewm(&gains, period, EwmMode::Recursive);
    let avg_loss = ewm(&losses, period, EwmMode::Recursive);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| {
            if g.is_nan() || l.is_nan() || l == 0.0 {
                50.0
            } else {
                100.0 - 100.0 / (1.0 + g / l)
            }
        })
        .collect()
}

fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        if values[i].is_finite() && values[i - 1].is_finite() {
            out[i] = values[i] - values[i - 1];
        }
    }
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain == 0.0, avg_loss == 0.0) {
        (true, true) => 50.0,
        (false, true) => 100.0,
        _ => 100.0 - 100.0 / (1.0 + avg_gain / avg_loss),
    }
}
