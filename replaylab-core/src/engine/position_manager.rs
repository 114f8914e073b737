//! Single-position state machine: FLAT, LONG, SHORT.
//!
//! Cash accounting: margin is reserved, never debited. Opening debits the
//! entry commission. Closing credits the gross price pnl and debits the exit
//! commission. So at any mark price `equity = cash + unrealized_pnl`, and the
//! equity change across a round trip equals that trade's `pnl`.

use super::state::ReplayConfig;
use crate::domain::{Action, Bar, ExitReason, Position, PositionSide, Trade};
use chrono::{DateTime, Utc};

/// Outcome of applying an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Unchanged,
    Opened(PositionSide),
    Closed(Trade),
}

#[derive(Debug, Clone)]
pub struct PositionManager {
    cash: f64,
    position: Option<Position>,
    leverage: f64,
    position_size_pct: f64,
    commission_rate: f64,
    stop_loss_pct: Option<f64>,
    take_profit_pct: Option<f64>,
}

impl PositionManager {
    pub fn new(config: &ReplayConfig) -> Self {
        Self {
            cash: config.initial_capital,
            position: None,
            leverage: config.leverage,
            position_size_pct: config.position_size_pct,
            commission_rate: config.commission_rate,
            stop_loss_pct: config.stop_loss_pct,
            take_profit_pct: config.take_profit_pct,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn side(&self) -> Option<PositionSide> {
        self.position.as_ref().map(|p| p.side)
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn unrealized_pnl(&self, mark_price: f64) -> f64 {
        self.position
            .as_ref()
            .map_or(0.0, |p| p.unrealized_pnl(mark_price))
    }

    pub fn equity(&self, mark_price: f64) -> f64 {
        self.cash + self.unrealized_pnl(mark_price)
    }

    /// Apply an agent action at `price` (the current bar's close).
    ///
    /// Same-side entries and CLOSE while flat are no-ops. An opposite-side
    /// action closes the open position and leaves the book flat.
    pub fn apply(&mut self, action: Action, price: f64, timestamp: DateTime<Utc>, bar_index: usize) -> Transition {
        match (action, self.side()) {
            (Action::Hold, _) | (Action::Close, None) => Transition::Unchanged,
            (Action::Buy, Some(PositionSide::Long)) | (Action::Sell, Some(PositionSide::Short)) => {
                Transition::Unchanged
            }
            (Action::Buy, None) => self.open(PositionSide::Long, price, timestamp, bar_index),
            (Action::Sell, None) => self.open(PositionSide::Short, price, timestamp, bar_index),
            (Action::Close, Some(_)) | (Action::Buy, Some(PositionSide::Short)) | (Action::Sell, Some(PositionSide::Long)) => {
                match self.close(price, timestamp, bar_index, ExitReason::Signal) {
                    Some(trade) => Transition::Closed(trade),
                    None => Transition::Unchanged,
                }
            }
        }
    }

    /// Check protective levels against the bar's range.
    ///
    /// Stop-loss and liquidation are adverse levels; whichever sits closer to
    /// entry is reached first and wins (stop-loss on a tie). Adverse exits are
    /// checked before take-profit. Exits fill at the level price.
    pub fn check_exits(&mut self, bar: &Bar, bar_index: usize) -> Option<Trade> {
        let pos = self.position.as_ref()?;

        let (adverse_price, adverse_reason) = match (pos.side, pos.stop_loss_price) {
            (PositionSide::Long, Some(stop)) if stop >= pos.liquidation_price => (stop, ExitReason::StopLoss),
            (PositionSide::Short, Some(stop)) if stop <= pos.liquidation_price => (stop, ExitReason::StopLoss),
            _ => (pos.liquidation_price, ExitReason::Liquidation),
        };
        let adverse_hit = match pos.side {
            PositionSide::Long => bar.low <= adverse_price,
            PositionSide::Short => bar.high >= adverse_price,
        };
        if adverse_hit {
            return self.close(adverse_price, bar.timestamp, bar_index, adverse_reason);
        }

        let take_profit = pos.take_profit_price?;
        let tp_hit = match pos.side {
            PositionSide::Long => bar.high >= take_profit,
            PositionSide::Short => bar.low <= take_profit,
        };
        if tp_hit {
            return self.close(take_profit, bar.timestamp, bar_index, ExitReason::TakeProfit);
        }
        None
    }

    /// Close the open position at `price`. Returns `None` when flat.
    pub fn close(
        &mut self,
        price: f64,
        timestamp: DateTime<Utc>,
        bar_index: usize,
        reason: ExitReason,
    ) -> Option<Trade> {
        let pos = self.position.take()?;

        let gross = pos.unrealized_pnl(price);
        let exit_commission = price * pos.size * self.commission_rate;
        self.cash += gross - exit_commission;

        let pnl = gross - pos.entry_commission - exit_commission;
        let pnl_pct = if pos.margin_used > 0.0 {
            pnl / pos.margin_used * 100.0
        } else {
            0.0
        };

        Some(Trade {
            side: pos.side,
            entry_bar: pos.entry_bar,
            entry_time: pos.opened_at,
            entry_price: pos.entry_price,
            exit_bar: bar_index,
            exit_time: timestamp,
            exit_price: price,
            exit_reason: reason,
            size: pos.size,
            leverage: pos.leverage,
            margin_used: pos.margin_used,
            entry_commission: pos.entry_commission,
            exit_commission,
            pnl,
            pnl_pct,
        })
    }

    fn open(&mut self, side: PositionSide, price: f64, timestamp: DateTime<Utc>, bar_index: usize) -> Transition {
        // Only reachable while flat, so equity == cash.
        let notional = self.cash * self.position_size_pct * self.leverage;
        if !(notional > 0.0 && price > 0.0) {
            return Transition::Unchanged;
        }

        let size = notional / price;
        let margin_used = notional / self.leverage;
        let entry_commission = notional * self.commission_rate;
        self.cash -= entry_commission;

        let sign = side.sign();
        self.position = Some(Position {
            side,
            entry_price: price,
            size,
            leverage: self.leverage,
            margin_used,
            entry_commission,
            stop_loss_price: self.stop_loss_pct.map(|pct| price * (1.0 - sign * pct)),
            take_profit_price: self.take_profit_pct.map(|pct| price * (1.0 + sign * pct)),
            liquidation_price: price * (1.0 - sign / self.leverage),
            opened_at: timestamp,
            entry_bar: bar_index,
        });
        Transition::Opened(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, h, 0, 0).unwrap()
    }

    fn bar(h: u32, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(ts(h), close, high, low, close, 1000.0)
    }

    fn config() -> ReplayConfig {
        ReplayConfig::new(10_000.0, 0)
            .with_position_size_pct(1.0)
            .with_commission_rate(0.0)
    }

    #[test]
    fn buy_sizes_by_equity_and_leverage() {
        let cfg = config().with_leverage(5.0).with_commission_rate(0.001);
        let mut pm = PositionManager::new(&cfg);
        assert_eq!(pm.apply(Action::Buy, 100.0, ts(0), 0), Transition::Opened(PositionSide::Long));

        let pos = pm.position().unwrap();
        assert!((pos.size - 500.0).abs() < 1e-9);
        assert!((pos.margin_used - 10_000.0).abs() < 1e-9);
        assert!((pos.margin_used - pos.notional() / pos.leverage).abs() < 1e-9);
        assert!((pos.liquidation_price - 80.0).abs() < 1e-9);
        assert!((pm.cash() - (10_000.0 - 50.0)).abs() < 1e-9);
    }

    #[test]
    fn close_realizes_pnl_net_of_commissions() {
        let mut pm = PositionManager::new(&config().with_commission_rate(0.001));
        pm.apply(Action::Buy, 100.0, ts(0), 0);
        let Transition::Closed(trade) = pm.apply(Action::Close, 110.0, ts(1), 1) else {
            panic!("expected close");
        };
        // size 100, entry comm 10, exit comm 11
        assert!((trade.pnl - (1000.0 - 10.0 - 11.0)).abs() < 1e-9);
        assert_eq!(trade.exit_reason, ExitReason::Signal);
        assert!((pm.cash() - (10_000.0 + trade.pnl)).abs() < 1e-9);
        assert!(pm.is_flat());
    }

    #[test]
    fn opposite_action_closes_without_reversal() {
        let mut pm = PositionManager::new(&config());
        pm.apply(Action::Sell, 100.0, ts(0), 0);
        assert_eq!(pm.side(), Some(PositionSide::Short));
        assert!(matches!(pm.apply(Action::Buy, 90.0, ts(1), 1), Transition::Closed(_)));
        assert!(pm.is_flat());
    }

    #[test]
    fn no_op_transitions() {
        let mut pm = PositionManager::new(&config());
        assert_eq!(pm.apply(Action::Close, 100.0, ts(0), 0), Transition::Unchanged);
        assert_eq!(pm.apply(Action::Hold, 100.0, ts(0), 0), Transition::Unchanged);
        pm.apply(Action::Buy, 100.0, ts(0), 0);
        let before = pm.position().cloned();
        assert_eq!(pm.apply(Action::Buy, 120.0, ts(1), 1), Transition::Unchanged);
        assert_eq!(pm.position().cloned(), before);
    }

    #[test]
    fn stop_loss_exits_at_level() {
        let mut pm = PositionManager::new(&config().with_stop_loss_pct(0.05));
        pm.apply(Action::Buy, 100.0, ts(0), 0);
        let trade = pm.check_exits(&bar(1, 101.0, 94.0, 96.0), 1).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert!((trade.exit_price - 95.0).abs() < 1e-9);
    }

    #[test]
    fn stop_loss_wins_same_bar_tie_with_take_profit() {
        let mut pm = PositionManager::new(&config().with_stop_loss_pct(0.05).with_take_profit_pct(0.05));
        pm.apply(Action::Buy, 100.0, ts(0), 0);
        let trade = pm.check_exits(&bar(1, 106.0, 94.0, 100.0), 1).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn take_profit_short() {
        let mut pm = PositionManager::new(&config().with_take_profit_pct(0.1));
        pm.apply(Action::Sell, 100.0, ts(0), 0);
        assert!(pm.check_exits(&bar(1, 101.0, 95.0, 96.0), 1).is_none());
        let trade = pm.check_exits(&bar(2, 95.0, 89.0, 90.0), 2).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert!((trade.exit_price - 90.0).abs() < 1e-9);
        assert!(trade.pnl > 0.0);
    }

    #[test]
    fn liquidation_loses_full_margin() {
        let mut pm = PositionManager::new(&config().with_leverage(10.0));
        pm.apply(Action::Buy, 100.0, ts(0), 0);
        let trade = pm.check_exits(&bar(1, 100.0, 85.0, 88.0), 1).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::Liquidation);
        assert!((trade.exit_price - 90.0).abs() < 1e-9);
        assert!((trade.pnl + trade.margin_used).abs() < 1e-6);
        assert!((trade.pnl_pct + 100.0).abs() < 1e-6);
    }

    #[test]
    fn liquidation_preempts_wider_stop() {
        // 10x liquidation at 90 sits above a 15% stop at 85.
        let mut pm = PositionManager::new(&config().with_leverage(10.0).with_stop_loss_pct(0.15));
        pm.apply(Action::Buy, 100.0, ts(0), 0);
        let trade = pm.check_exits(&bar(1, 100.0, 80.0, 82.0), 1).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::Liquidation);
        assert!((trade.exit_price - 90.0).abs() < 1e-9);
    }

    #[test]
    fn short_liquidation_above_entry() {
        let mut pm = PositionManager::new(&config().with_leverage(4.0));
        pm.apply(Action::Sell, 100.0, ts(0), 0);
        assert!((pm.position().unwrap().liquidation_price - 125.0).abs() < 1e-9);
        let trade = pm.check_exits(&bar(1, 126.0, 100.0, 120.0), 1).unwrap();
        assert_eq!(trade.exit_reason, ExitReason::Liquidation);
    }

    #[test]
    fn equity_identity_holds_while_open() {
        let mut pm = PositionManager::new(&config().with_commission_rate(0.002).with_leverage(3.0));
        pm.apply(Action::Buy, 50.0, ts(0), 0);
        let mark = 55.0;
        let expected = pm.cash() + pm.position().unwrap().unrealized_pnl(mark);
        assert!((pm.equity(mark) - expected).abs() < 1e-9);
    }
}
