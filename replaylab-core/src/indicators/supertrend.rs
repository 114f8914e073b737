//! Supertrend: ATR bands around the bar midpoint that ratchet with the trend.
//!
//! Direction flips up when the close crosses above the upper band and down
//! when it crosses below the lower band. The plotted line is the lower band
//! in an uptrend and the upper band in a downtrend.

use super::atr::{true_range, wilder_smooth};
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Up,
    Down,
}

/// Line and direction per bar; `None` during warmup or after bad data.
#[derive(Debug, Clone, Default)]
pub struct SupertrendSeries {
    pub line: Vec<f64>,
    pub direction: Vec<Option<TrendDirection>>,
}

impl SupertrendSeries {
    /// True when bar `i` turned up from a down bar `i - 1`.
    pub fn flipped_up(&self, i: usize) -> bool {
        i > 0
            && self.direction.get(i) == Some(&Some(TrendDirection::Up))
            && self.direction[i - 1] == Some(TrendDirection::Down)
    }

    /// True when bar `i` turned down from an up bar `i - 1`.
    pub fn flipped_down(&self, i: usize) -> bool {
        i > 0
            && self.direction.get(i) == Some(&Some(TrendDirection::Down))
            && self.direction[i - 1] == Some(TrendDirection::Up)
    }
}

#[derive(Debug, Clone)]
pub struct Supertrend {
    period: usize,
    multiplier: f64,
    name: String,
}

impl Supertrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period >= 1, "Supertrend period must be >= 1");
        Self {
            period,
            multiplier,
            name: format!("supertrend_{period}_{multiplier}"),
        }
    }

    /// Compute both the line and the direction series.
    pub fn compute_series(&self, bars: &[Bar]) -> SupertrendSeries {
        let n = bars.len();
        let mut out = SupertrendSeries {
            line: vec![f64::NAN; n],
            direction: vec![None; n],
        };

        let atr = wilder_smooth(&true_range(bars), self.period);
        let Some(start) = atr.iter().position(|v| !v.is_nan()) else {
            return out;
        };

        let hl2 = (bars[start].high + bars[start].low) / 2.0;
        let mut upper = hl2 + self.multiplier * atr[start];
        let mut lower = hl2 - self.multiplier * atr[start];
        let mut trend = TrendDirection::Up;
        out.line[start] = lower;
        out.direction[start] = Some(trend);

        for i in (start + 1)..n {
            let bar = &bars[i];
            if atr[i].is_nan() || !bar.has_finite_prices() {
                continue;
            }

            let hl2 = (bar.high + bar.low) / 2.0;
            let basic_upper = hl2 + self.multiplier * atr[i];
            let basic_lower = hl2 - self.multiplier * atr[i];

            let prev_close = bars[i - 1].close;
            if prev_close.is_finite() && prev_close <= upper {
                upper = basic_upper.min(upper);
            } else {
                upper = basic_upper;
            }
            if prev_close.is_finite() && prev_close >= lower {
                lower = basic_lower.max(lower);
            } else {
                lower = basic_lower;
            }

            trend = match trend {
                TrendDirection::Up if bar.close < lower => TrendDirection::Down,
                TrendDirection::Down if bar.close > upper => TrendDirection::Up,
                t => t,
            };

            out.line[i] = match trend {
                TrendDirection::Up => lower,
                TrendDirection::Down => upper,
            };
            out.direction[i] = Some(trend);
        }

        out
    }
}

impl Indicator for Supertrend {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        self.compute_series(bars).line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    fn trending(n: usize, start: f64, step: f64) -> Vec<Bar> {
        let data: Vec<_> = (0..n)
            .map(|i| {
                let base = start + i as f64 * step;
                let (open, close) = if step >= 0.0 { (base - 1.0, base + 1.0) } else { (base + 1.0, base - 1.0) };
                (open, base + 3.0, base - 3.0, close)
            })
            .collect();
        make_ohlc_bars(&data)
    }

    #[test]
    fn uptrend_line_below_price() {
        let bars = trending(15, 100.0, 2.0);
        let st = Supertrend::new(3, 2.0).compute_series(&bars);
        for i in 5..15 {
            assert!(st.line[i] < bars[i].close, "bar {i}");
            assert_eq!(st.direction[i], Some(TrendDirection::Up));
        }
    }

    #[test]
    fn downtrend_flips_down() {
        let bars = trending(15, 200.0, -3.0);
        let st = Supertrend::new(3, 2.0).compute_series(&bars);
        let flipped = (1..15).any(|i| st.flipped_down(i));
        assert!(flipped, "supertrend should flip down in a falling series");
        assert_eq!(st.direction[14], Some(TrendDirection::Down));
        assert!(st.line[14] > bars[14].close);
    }

    #[test]
    fn too_few_bars_is_empty() {
        let bars = make_ohlc_bars(&[(100.0, 105.0, 95.0, 102.0)]);
        let st = Supertrend::new(3, 2.0).compute_series(&bars);
        assert!(st.line.iter().all(|v| v.is_nan()));
        assert!(st.direction.iter().all(|d| d.is_none()));
    }
}
