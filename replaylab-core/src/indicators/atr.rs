//! True range and its Wilder-smoothed average.
//!
//! `wilder_smooth` is shared with the Wilder RSI.

use super::Indicator;
use crate::domain::Bar;

/// Lookback equals the period; the first bar's range is excluded from the
/// seed because it has no previous close.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut tr = true_range(bars);
        if let Some(first) = tr.first_mut() {
            *first = f64::NAN;
        }
        wilder_smooth(&tr, self.period)
    }
}

/// `max(high - low, |high - prev_close|, |low - prev_close|)`; bar 0 is
/// just `high - low`. NaN where this bar's high/low or the previous close
/// is not finite.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let range = bar.high - bar.low;
            if !range.is_finite() {
                return f64::NAN;
            }
            if i == 0 {
                return range;
            }
            let pc = bars[i - 1].close;
            if !pc.is_finite() {
                return f64::NAN;
            }
            range.max((bar.high - pc).abs()).max((bar.low - pc).abs())
        })
        .collect()
}

/// Wilder smoothing (alpha = 1/period), seeded by the simple mean of the
/// first run of `period` consecutive finite values. A non-finite value after
/// the seed yields NaN at that index and is left out of the average.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut run = 0usize;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        if !v.is_finite() {
            run = 0;
            continue;
        }
        run += 1;
        if run == period {
            seed_end = Some(i + 1);
            break;
        }
    }
    let Some(seed_end) = seed_end else {
        return result;
    };

    let seed = values[(seed_end - period)..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in seed_end..n {
        if !values[i].is_finite() {
            continue;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}
