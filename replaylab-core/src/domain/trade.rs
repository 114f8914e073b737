//! Trade: a completed round trip.

use super::position::PositionSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What closed the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    Liquidation,
    EndOfData,
}

impl ExitReason {
    pub const ALL: [ExitReason; 5] = [
        ExitReason::Signal,
        ExitReason::StopLoss,
        ExitReason::TakeProfit,
        ExitReason::Liquidation,
        ExitReason::EndOfData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Signal => "signal",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::Liquidation => "liquidation",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one entry/exit pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub side: PositionSide,
    pub entry_bar: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub size: f64,
    pub leverage: f64,
    pub margin_used: f64,

    // ── PnL ──
    pub entry_commission: f64,
    pub exit_commission: f64,
    /// Net of both commissions.
    pub pnl: f64,
    /// `pnl` as a percentage of margin used.
    pub pnl_pct: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn total_commission(&self) -> f64 {
        self.entry_commission + self.exit_commission
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade() -> Trade {
        Trade {
            side: PositionSide::Long,
            entry_bar: 4,
            entry_time: Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap(),
            entry_price: 100.0,
            exit_bar: 8,
            exit_time: Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap(),
            exit_price: 110.0,
            exit_reason: ExitReason::Signal,
            size: 50.0,
            leverage: 1.0,
            margin_used: 5000.0,
            entry_commission: 5.0,
            exit_commission: 5.5,
            pnl: 489.5,
            pnl_pct: 9.79,
        }
    }

    #[test]
    fn winner_and_commission() {
        let t = sample_trade();
        assert!(t.is_winner());
        assert!((t.total_commission() - 10.5).abs() < 1e-10);
        assert_eq!(t.bars_held(), 4);
    }

    #[test]
    fn exit_reason_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&ExitReason::StopLoss).unwrap(), "\"stop_loss\"");
        assert_eq!(ExitReason::EndOfData.to_string(), "end_of_data");
    }
}
