//! Domain types for the replay engine.

pub mod bar;
pub mod decision;
pub mod equity;
pub mod position;
pub mod series;
pub mod trade;

pub use bar::Bar;
pub use decision::{Action, Decision, DecisionDefect};
pub use equity::EquityPoint;
pub use position::{Position, PositionSide};
pub use series::{BarSeries, LookbackView, SeriesError};
pub use trade::{ExitReason, Trade};
