//! Append-only trade ledger and per-bar equity curve.

use crate::domain::{EquityPoint, Trade};

/// Closed trades in the order they were realised.
#[derive(Debug, Clone, Default)]
pub struct TradeLedger {
    trades: Vec<Trade>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn commission_paid(&self) -> f64 {
        self.trades.iter().map(|t| t.total_commission()).sum()
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }
}

/// One point per processed bar.
#[derive(Debug, Clone, Default)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, point: EquityPoint) {
        debug_assert!(
            (point.equity - (point.cash + point.unrealized_pnl)).abs() < 1e-6,
            "equity accounting violated: equity={}, cash={} + unrealized={}",
            point.equity,
            point.cash,
            point.unrealized_pnl
        );
        self.points.push(point);
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_equity(&self) -> Option<f64> {
        self.points.last().map(|p| p.equity)
    }

    pub fn into_points(self) -> Vec<EquityPoint> {
        self.points
    }
}
