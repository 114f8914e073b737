//! Causal feature engineering for probability models.
//!
//! `FeatureEngineer::compute` turns a bar slice into one feature row per bar.
//! Row `t` is derived from bars `[0..=t]` only. Gaps are forward-filled from
//! earlier rows and any value still missing becomes 0; nothing is ever filled
//! backwards from later rows.

use crate::domain::Bar;
use crate::indicators::{
    closes, ewm, pct_change, rolling_mean, rolling_std, rolling_sum, rsi_ewm, true_range, EwmMode, Indicator,
    Sma,
};

/// Column names, in row order.
pub const FEATURE_NAMES: [&str; 21] = [
    // Trend
    "ema_5_10_ratio",
    "ema_10_20_ratio",
    "ema_20_50_ratio",
    "price_ema20_ratio",
    "price_ema50_ratio",
    // Momentum
    "rsi_14",
    "rsi_7",
    "momentum_3",
    "momentum_5",
    "momentum_10",
    "roc_5",
    // MACD
    "macd_hist",
    // Volatility
    "atr_pct",
    "bb_position",
    // Volume
    "volume_ratio",
    "cvd_normalized",
    // Candle
    "body_ratio",
    "upper_wick",
    "lower_wick",
    "candle_direction",
    "consecutive_bullish",
];

/// Dense feature table: `rows[t][k]` is feature `names[k]` at bar `t`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(|r| r.as_slice())
    }

    pub fn last_row(&self) -> Option<&[f64]> {
        self.rows.last().map(|r| r.as_slice())
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// One named column across all rows.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let k = self.names.iter().position(|n| n == name)?;
        Some(self.rows.iter().map(|r| r[k]).collect())
    }
}

/// Stateless producer of the 21-column feature set.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    pub fn feature_names(&self) -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    pub fn compute(&self, bars: &[Bar]) -> FeatureMatrix {
        let n = bars.len();
        let close = closes(bars);
        let open: Vec<f64> = bars.iter().map(|b| b.open).collect();
        let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let volume: Vec<f64> = bars.iter().map(|b| b.volume).collect();

        // ─── Trend ───
        let ema5 = ewm(&close, 5, EwmMode::Adjusted);
        let ema10 = ewm(&close, 10, EwmMode::Adjusted);
        let ema20 = ewm(&close, 20, EwmMode::Adjusted);
        let ema50 = ewm(&close, 50, EwmMode::Adjusted);

        // ─── MACD ───
        let ema12 = ewm(&close, 12, EwmMode::Adjusted);
        let ema26 = ewm(&close, 26, EwmMode::Adjusted);
        let macd: Vec<f64> = ema12.iter().zip(&ema26).map(|(a, b)| a - b).collect();
        let macd_signal = ewm(&macd, 9, EwmMode::Adjusted);

        // ─── Momentum ───
        let rsi14 = rsi_ewm(&close, 14);
        let rsi7 = rsi_ewm(&close, 7);
        let mom3 = pct_change(&close, 3);
        let mom5 = pct_change(&close, 5);
        let mom10 = pct_change(&close, 10);

        // ─── Volatility ───
        let atr14 = rolling_mean(&true_range(bars), 14);
        let bb_mid = Sma::new(20).compute(bars);
        let bb_std = rolling_std(&close, 20);

        // ─── Volume ───
        let vol_sma20 = Sma::volume(20).compute(bars);
        let delta: Vec<f64> = (0..n)
            .map(|i| match bars[i].has_finite_prices() {
                false => f64::NAN,
                true if bars[i].is_bullish() => volume[i],
                true => -volume[i],
            })
            .collect();
        let cvd10 = rolling_sum(&delta, 10);

        // ─── Candle ───
        let direction: Vec<f64> = (0..n)
            .map(|i| match bars[i].has_finite_prices() {
                false => f64::NAN,
                true if bars[i].is_bullish() => 1.0,
                true => 0.0,
            })
            .collect();
        let bullish3 = rolling_sum(&direction, 3);

        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            // Carries the previous row forward.
            if !bars[i].has_finite_prices() {
                rows.push(vec![f64::NAN; FEATURE_NAMES.len()]);
                continue;
            }
            let range = high[i] - low[i];
            let range = if range == 0.0 { f64::NAN } else { range };
            let bullish = bars[i].is_bullish();
            let bb_lower = bb_mid[i] - 2.0 * bb_std[i];
            let bb_upper = bb_mid[i] + 2.0 * bb_std[i];

            rows.push(vec![
                ema5[i] / ema10[i],
                ema10[i] / ema20[i],
                ema20[i] / ema50[i],
                close[i] / ema20[i],
                close[i] / ema50[i],
                rsi14[i],
                rsi7[i],
                mom3[i],
                mom5[i],
                mom10[i],
                mom5[i],
                macd[i] - macd_signal[i],
                atr14[i] / close[i] * 100.0,
                (close[i] - bb_lower) / (bb_upper - bb_lower),
                volume[i] / vol_sma20[i],
                cvd10[i] / vol_sma20[i] / 10.0,
                (close[i] - open[i]).abs() / range,
                (if bullish { high[i] - close[i] } else { high[i] - open[i] }) / range,
                (if bullish { open[i] - low[i] } else { close[i] - low[i] }) / range,
                direction[i],
                bullish3[i],
            ]);
        }

        fill_forward_then_zero(&mut rows);

        FeatureMatrix {
            names: self.feature_names(),
            rows,
        }
    }
}

/// Replace each non-finite value with the nearest earlier finite one in its
/// column, or 0 when there is none.
fn fill_forward_then_zero(rows: &mut [Vec<f64>]) {
    let Some(width) = rows.first().map(|r| r.len()) else {
        return;
    };
    let mut last_seen = vec![0.0; width];
    for row in rows.iter_mut() {
        for (k, v) in row.iter_mut().enumerate() {
            if v.is_finite() {
                last_seen[k] = *v;
            } else {
                *v = last_seen[k];
            }
        }
    }
}
