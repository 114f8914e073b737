//! Per-bar context handed to agents alongside the window.

use crate::domain::{LookbackView, PositionSide};
use serde::{Deserialize, Serialize};

/// Order-flow aggregates for the current bar, derived from the window only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderFlow {
    /// Current volume over the mean volume of the last 20 bars.
    pub volume_ratio: f64,
    /// Signed volume over the last 10 bars (+ for up candles, - otherwise).
    pub cvd: f64,
    /// Percent change of close versus 4 bars earlier.
    pub momentum: f64,
    pub is_high_volume: bool,
}

const VOLUME_WINDOW: usize = 20;
const CVD_WINDOW: usize = 10;
const MOMENTUM_LOOKBACK: usize = 4;
const HIGH_VOLUME_RATIO: f64 = 1.5;

impl OrderFlow {
    pub fn from_window(window: &LookbackView<'_>) -> Self {
        if window.len() < 2 {
            return Self::default();
        }
        let current = window.current();

        let recent = window.tail(VOLUME_WINDOW);
        let avg_volume = recent.iter().map(|b| b.volume).sum::<f64>() / recent.len() as f64;
        let volume_ratio = if avg_volume > 0.0 {
            current.volume / avg_volume
        } else {
            1.0
        };

        let cvd = window
            .tail(CVD_WINDOW)
            .iter()
            .filter(|b| b.has_finite_prices())
            .map(|b| if b.is_bullish() { b.volume } else { -b.volume })
            .sum();

        let momentum = match window.back(MOMENTUM_LOOKBACK) {
            Some(past) if past.close.is_finite() && past.close != 0.0 && current.close.is_finite() => {
                (current.close - past.close) / past.close * 100.0
            }
            _ => 0.0,
        };

        Self {
            volume_ratio,
            cvd,
            momentum,
            is_high_volume: volume_ratio > HIGH_VOLUME_RATIO,
        }
    }
}

/// Everything besides the window that an agent may use.
///
/// The open position's side is the only portfolio fact exposed; cash and
/// equity stay inside the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AgentContext {
    pub order_flow: OrderFlow,
    pub position: Option<PositionSide>,
}

impl AgentContext {
    pub fn new(order_flow: OrderFlow, position: Option<PositionSide>) -> Self {
        Self { order_flow, position }
    }

    /// Context for the window's current bar.
    pub fn from_window(window: &LookbackView<'_>, position: Option<PositionSide>) -> Self {
        Self::new(OrderFlow::from_window(window), position)
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BarSeries;
    use crate::indicators::make_bars;

    #[test]
    fn single_bar_is_empty() {
        let series = BarSeries::new("T", make_bars(&[100.0])).unwrap();
        let flow = OrderFlow::from_window(&series.window(0).unwrap());
        assert_eq!(flow, OrderFlow::default());
    }

    #[test]
    fn momentum_needs_five_bars() {
        let series = BarSeries::new("T", make_bars(&[100.0, 101.0, 102.0, 103.0, 110.0])).unwrap();
        let short = OrderFlow::from_window(&series.window(3).unwrap());
        assert_eq!(short.momentum, 0.0);
        let full = OrderFlow::from_window(&series.window(4).unwrap());
        assert!((full.momentum - 10.0).abs() < 1e-12);
    }

    #[test]
    fn cvd_signs_volume_by_candle() {
        // make_bars: open = prev close; first bar open == close (bearish by rule)
        let series = BarSeries::new("T", make_bars(&[100.0, 101.0, 100.0])).unwrap();
        let flow = OrderFlow::from_window(&series.window(2).unwrap());
        assert!((flow.cvd - (-1000.0 + 1000.0 - 1000.0)).abs() < 1e-12);
        assert!((flow.volume_ratio - 1.0).abs() < 1e-12);
        assert!(!flow.is_high_volume);
    }

    #[test]
    fn high_volume_flag() {
        let mut bars = make_bars(&[100.0; 10]);
        bars[9].volume = 5000.0;
        let series = BarSeries::new("T", bars).unwrap();
        let flow = OrderFlow::from_window(&series.window(9).unwrap());
        // 5000 / mean(9 * 1000 + 5000) / 10 = 5000 / 1400
        assert!((flow.volume_ratio - 5000.0 / 1400.0).abs() < 1e-12);
        assert!(flow.is_high_volume);
    }

    #[test]
    fn non_finite_bars_stay_out_of_the_aggregates() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);
        bars[1].close = f64::INFINITY;
        let series = BarSeries::new("T", bars).unwrap();
        let flow = OrderFlow::from_window(&series.window(5).unwrap());
        // bar 0 bearish, bar 1 skipped, bars 2..=5 bullish
        assert!((flow.cvd - 3000.0).abs() < 1e-12);
        // momentum compares against bar 1
        assert_eq!(flow.momentum, 0.0);
    }
}
