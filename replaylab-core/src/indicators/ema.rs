//! Exponential moving averages.
//!
//! `Ema` is the classic indicator: seeded with the SMA of the first `period`
//! closes, then `EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1]`.
//! `ewm` is the span-parameterised exponential mean used by feature
//! engineering, which produces a value from the first observation onward.

use super::{closes, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        ema_of_series(&closes(bars), self.period)
    }
}

/// SMA-seeded EMA of an arbitrary series.
///
/// The seed is the mean of the first run of `period` consecutive finite
/// values. A non-finite value after the seed yields NaN at that index and
/// leaves the running average untouched for the next finite value.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period || period == 0 {
        return result;
    }

    let mut run = 0usize;
    let Some(seed_end) = values.iter().position(|v| {
        run = if v.is_finite() { run + 1 } else { 0 };
        run == period
    }) else {
        return result;
    };

    let seed = values[(seed_end + 1 - period)..=seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end] = seed;

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = seed;
    for i in (seed_end + 1)..n {
        if !values[i].is_finite() {
            continue;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

/// Weighting scheme for `ewm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EwmMode {
    /// Recursive form seeded by the first observation:
    /// `y[0] = x[0]`, `y[t] = a*x[t] + (1-a)*y[t-1]`.
    Recursive,
    /// Normalised weights over all observations so far:
    /// `y[t] = sum((1-a)^k * x[t-k]) / sum((1-a)^k)`.
    Adjusted,
}

/// Exponentially weighted mean with `alpha = 2 / (span + 1)`.
///
/// Non-finite inputs are skipped: the output repeats the previous value (NaN
/// until the first finite observation).
pub fn ewm(values: &[f64], span: usize, mode: EwmMode) -> Vec<f64> {
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let decay = 1.0 - alpha;
    let mut result = Vec::with_capacity(values.len());

    let mut num = 0.0;
    let mut den = 0.0;
    let mut prev = f64::NAN;
    for &x in values {
        if !x.is_finite() {
            result.push(prev);
            continue;
        }
        let y = match mode {
            EwmMode::Recursive => {
                if prev.is_nan() {
                    x
                } else {
                    alpha * x + decay * prev
                }
            }
            EwmMode::Adjusted => {
                num = x + decay * num;
                den = 1.0 + decay * den;
                num / den
            }
        };
        result.push(y);
        prev = y;
    }
    result
}
