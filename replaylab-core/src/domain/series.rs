//! BarSeries and LookbackView: the causal boundary of the engine.
//!
//! A `BarSeries` owns the full, time-ordered history. The only way to hand
//! bars to an agent is a `LookbackView`, which borrows the prefix `[0..=i]`.
//! Because the view holds a slice that ends at `i`, there is no index or
//! method on it that can reach bar `i + 1`.

use super::bar::Bar;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while building a series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("timestamps must be strictly increasing: bar {index} at {current} does not follow {previous}")]
    NonIncreasingTimestamp {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

/// Immutable, strictly time-ordered sequence of bars for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series, rejecting any timestamp that does not strictly increase.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(SeriesError::NonIncreasingTimestamp {
                    index: i + 1,
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            bars,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Full history. Used by loaders, exporters, and ahead-of-loop
    /// precomputation; never passed to `Agent::analyze`.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Causally-bounded view of bars `[0..=index]`.
    ///
    /// Returns `None` when `index` is past the end of the series.
    pub fn window(&self, index: usize) -> Option<LookbackView<'_>> {
        if index >= self.bars.len() {
            return None;
        }
        Some(LookbackView {
            bars: &self.bars[..=index],
        })
    }
}

/// Read-only prefix of a series ending at the bar currently being processed.
///
/// Always non-empty.
#[derive(Debug, Clone, Copy)]
pub struct LookbackView<'a> {
    bars: &'a [Bar],
}

impl<'a> LookbackView<'a> {
    /// All visible bars, oldest first. The last element is the current bar.
    pub fn bars(&self) -> &'a [Bar] {
        self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// A view always contains at least the current bar.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Series index of the current bar.
    pub fn index(&self) -> usize {
        self.bars.len() - 1
    }

    /// The bar currently being processed.
    pub fn current(&self) -> &'a Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// The bar `n` positions before the current one (`n = 0` is the current bar).
    pub fn back(&self, n: usize) -> Option<&'a Bar> {
        self.bars.len().checked_sub(n + 1).map(|i| &self.bars[i])
    }

    /// Close prices of all visible bars.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The most recent `n` bars (fewer when the view is shorter).
    pub fn tail(&self, n: usize) -> &'a [Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bars(n: usize) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar::new(t0 + Duration::minutes(5 * i as i64), c, c + 1.0, c - 1.0, c, 1000.0)
            })
            .collect()
    }

    #[test]
    fn rejects_out_of_order_timestamps() {
        let mut b = bars(3);
        b.swap(1, 2);
        let err = BarSeries::new("BTCUSDT", b).unwrap_err();
        assert!(matches!(err, SeriesError::NonIncreasingTimestamp { index: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        let mut b = bars(3);
        b[2].timestamp = b[1].timestamp;
        assert!(BarSeries::new("BTCUSDT", b).is_err());
    }

    #[test]
    fn window_ends_at_requested_index() {
        let series = BarSeries::new("BTCUSDT", bars(10)).unwrap();
        let view = series.window(3).unwrap();
        assert_eq!(view.len(), 4);
        assert_eq!(view.index(), 3);
        assert_eq!(view.current().close, 103.0);
        assert_eq!(view.bars().last().unwrap().timestamp, series.get(3).unwrap().timestamp);
    }

    #[test]
    fn window_past_end_is_none() {
        let series = BarSeries::new("BTCUSDT", bars(5)).unwrap();
        assert!(series.window(5).is_none());
        assert!(series.window(4).is_some());
    }

    #[test]
    fn back_and_tail_stay_inside_view() {
        let series = BarSeries::new("BTCUSDT", bars(10)).unwrap();
        let view = series.window(2).unwrap();
        assert_eq!(view.back(0).unwrap().close, 102.0);
        assert_eq!(view.back(2).unwrap().close, 100.0);
        assert!(view.back(3).is_none());
        assert_eq!(view.tail(20).len(), 3);
        assert_eq!(view.tail(1)[0].close, 102.0);
    }
}
