//! Equity curve sample.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account value at the close of one processed bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub unrealized_pnl: f64,
    /// `cash + unrealized_pnl`.
    pub equity: f64,
}
