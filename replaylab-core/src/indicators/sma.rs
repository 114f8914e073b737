//! Simple moving average over a chosen bar field.

use super::{rolling::rolling_mean, Indicator};
use crate::domain::Bar;

/// Which bar value an indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarField {
    Close,
    Volume,
    /// (high + low + close) / 3
    Typical,
}

impl BarField {
    pub fn extract(&self, bars: &[Bar]) -> Vec<f64> {
        bars.iter()
            .map(|b| match self {
                BarField::Close => b.close,
                BarField::Volume => b.volume,
                BarField::Typical => (b.high + b.low + b.close) / 3.0,
            })
            .collect()
    }

    fn label(&self) -> &'static str {
        match self {
            BarField::Close => "sma",
            BarField::Volume => "volume_sma",
            BarField::Typical => "typical_sma",
        }
    }
}

/// First valid value at index `period - 1`. A period of 0 is treated as 1.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    field: BarField,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self::of(BarField::Close, period)
    }

    pub fn volume(period: usize) -> Self {
        Self::of(BarField::Volume, period)
    }

    pub fn of(field: BarField, period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            field,
            name: format!("{}_{period}", field.label()),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_mean(&self.field.extract(bars), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    #[test]
    fn close_sma() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        let out = Sma::new(4).compute(&bars);
        assert!(out[..3].iter().all(|v| v.is_nan()));
        assert_approx(out[3], 11.5, DEFAULT_EPSILON);
        assert_approx(out[5], 13.5, DEFAULT_EPSILON);
    }

    #[test]
    fn volume_sma_reads_volume() {
        let mut bars = make_bars(&[1.0, 1.0, 1.0]);
        bars[0].volume = 100.0;
        bars[1].volume = 200.0;
        bars[2].volume = 600.0;
        let out = Sma::volume(3).compute(&bars);
        assert_approx(out[2], 300.0, DEFAULT_EPSILON);
        assert_eq!(Sma::volume(3).name(), "volume_sma_3");
    }

    #[test]
    fn typical_price() {
        // make_bars: high = max(o, c) + 1, low = min(o, c) - 1
        let bars = make_bars(&[10.0]);
        assert_approx(BarField::Typical.extract(&bars)[0], 10.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_close_poisons_its_window_only() {
        let mut bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        bars[2].close = f64::NAN;
        let out = Sma::new(3).compute(&bars);
        assert!(out[2].is_nan() && out[3].is_nan() && out[4].is_nan());
        assert_approx(out[5], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zero_period_clamps() {
        assert_eq!(Sma::new(0).lookback(), 0);
        assert_eq!(Sma::new(20).lookback(), 19);
    }
}
