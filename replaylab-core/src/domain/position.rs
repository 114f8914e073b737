//! Open leveraged position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            PositionSide::Long => 1.0,
            PositionSide::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => f.write_str("long"),
            PositionSide::Short => f.write_str("short"),
        }
    }
}

/// The single open position held by a `PositionManager`.
///
/// Protective levels are fixed at entry and never move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price: f64,
    /// Units of the asset held. Always positive; direction lives in `side`.
    pub size: f64,
    pub leverage: f64,
    /// Notional divided by leverage.
    pub margin_used: f64,
    /// Commission paid when the position was opened.
    pub entry_commission: f64,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
    pub liquidation_price: f64,
    pub opened_at: DateTime<Utc>,
    pub entry_bar: usize,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == PositionSide::Short
    }

    /// Entry notional (size times entry price).
    pub fn notional(&self) -> f64 {
        self.size * self.entry_price
    }

    /// Price move times size, signed by side. Excludes commissions.
    pub fn unrealized_pnl(&self, mark_price: f64) -> f64 {
        self.side.sign() * (mark_price - self.entry_price) * self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn position(side: PositionSide) -> Position {
        Position {
            side,
            entry_price: 100.0,
            size: 10.0,
            leverage: 2.0,
            margin_used: 500.0,
            entry_commission: 1.0,
            stop_loss_price: None,
            take_profit_price: None,
            liquidation_price: 50.0,
            opened_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            entry_bar: 0,
        }
    }

    #[test]
    fn unrealized_pnl_long() {
        let pos = position(PositionSide::Long);
        assert!((pos.unrealized_pnl(110.0) - 100.0).abs() < 1e-10);
        assert!((pos.unrealized_pnl(90.0) + 100.0).abs() < 1e-10);
    }

    #[test]
    fn unrealized_pnl_short() {
        let pos = position(PositionSide::Short);
        assert!((pos.unrealized_pnl(90.0) - 100.0).abs() < 1e-10);
        assert!(pos.is_short());
    }

    #[test]
    fn side_helpers() {
        assert_eq!(PositionSide::Long.opposite(), PositionSide::Short);
        assert_eq!(PositionSide::Short.sign(), -1.0);
        assert_eq!(PositionSide::Long.to_string(), "long");
    }
}
