//! Property tests for engine invariants.
//!
//! Uses proptest to verify, over random price paths and random decision streams:
//! 1. Equity count: one equity point per input bar
//! 2. Equity accounting: equity == cash + unrealized pnl at every bar
//! 3. Commission: trade pnl is gross price pnl minus both commissions
//! 4. Leverage: margin_used == notional / leverage for every trade
//! 5. One position: trades never overlap in time
//! 6. Determinism: identical inputs give identical outputs

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use replaylab_core::agent::ScheduledAgent;
use replaylab_core::domain::{Action, Bar, BarSeries};
use replaylab_core::engine::{run_replay, PositionManager, ReplayConfig, ReplayResult};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_returns() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-0.04..0.04_f64, 5..120)
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => Just(Action::Hold),
        1 => Just(Action::Buy),
        1 => Just(Action::Sell),
        1 => Just(Action::Close),
    ]
}

fn arb_config() -> impl Strategy<Value = ReplayConfig> {
    (
        1.0..20.0_f64,
        0.1..1.0_f64,
        0.0..0.005_f64,
        prop::option::of(0.005..0.2_f64),
        prop::option::of(0.005..0.3_f64),
    )
        .prop_map(|(leverage, size, commission, sl, tp)| ReplayConfig {
            initial_capital: 10_000.0,
            leverage,
            position_size_pct: size,
            commission_rate: commission,
            stop_loss_pct: sl,
            take_profit_pct: tp,
            warmup_bars: 0,
        })
}

fn build(returns: &[f64]) -> BarSeries {
    let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let mut price = 100.0;
    let bars = returns
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let open = price;
            price *= 1.0 + r;
            let close = price;
            Bar::new(
                t0 + Duration::minutes(15 * i as i64),
                open,
                open.max(close) * 1.004,
                open.min(close) * 0.996,
                close,
                1000.0,
            )
        })
        .collect();
    BarSeries::new("PROP", bars).unwrap()
}

fn replay(returns: &[f64], actions: &[Action], config: &ReplayConfig) -> (BarSeries, ReplayResult) {
    let series = build(returns);
    let agent: ScheduledAgent = series
        .bars()
        .iter()
        .zip(actions.iter().cycle())
        .map(|(b, &a)| (b.timestamp, a))
        .collect();
    let result = run_replay(&series, &agent, config, None).unwrap();
    (series, result)
}

proptest! {
    #[test]
    fn one_equity_point_per_bar(
        returns in arb_returns(),
        actions in prop::collection::vec(arb_action(), 1..30),
        config in arb_config(),
    ) {
        let (series, result) = replay(&returns, &actions, &config);
        prop_assert_eq!(result.equity_curve.len(), series.len());
        prop_assert!(result.open_position.is_none());
    }

    #[test]
    fn equity_identity_every_bar(
        returns in arb_returns(),
        actions in prop::collection::vec(arb_action(), 1..30),
        config in arb_config(),
    ) {
        let (_, result) = replay(&returns, &actions, &config);
        for p in &result.equity_curve {
            prop_assert!((p.equity - (p.cash + p.unrealized_pnl)).abs() < 1e-6);
        }
    }

    #[test]
    fn commission_and_leverage_invariants(
        returns in arb_returns(),
        actions in prop::collection::vec(arb_action(), 1..30),
        config in arb_config(),
    ) {
        let (_, result) = replay(&returns, &actions, &config);
        for t in &result.trades {
            let gross = (t.exit_price - t.entry_price) * t.size * t.side.sign();
            prop_assert!((t.pnl - (gross - t.entry_commission - t.exit_commission)).abs() < 1e-6);
            let notional = t.entry_price * t.size;
            prop_assert!((t.margin_used - notional / t.leverage).abs() < 1e-6);
            prop_assert!((t.entry_commission - notional * config.commission_rate).abs() < 1e-6);
        }
    }

    #[test]
    fn trades_never_overlap(
        returns in arb_returns(),
        actions in prop::collection::vec(arb_action(), 1..30),
        config in arb_config(),
    ) {
        let (_, result) = replay(&returns, &actions, &config);
        for t in &result.trades {
            prop_assert!(t.entry_bar <= t.exit_bar);
        }
        for pair in result.trades.windows(2) {
            // A new position may open on the bar the previous one closed, never earlier.
            prop_assert!(pair[1].entry_bar >= pair[0].exit_bar);
        }
    }

    #[test]
    fn realized_pnl_reconciles_with_final_equity(
        returns in arb_returns(),
        actions in prop::collection::vec(arb_action(), 1..30),
        config in arb_config(),
    ) {
        let (_, result) = replay(&returns, &actions, &config);
        let realized: f64 = result.trades.iter().map(|t| t.pnl).sum();
        prop_assert!((result.final_equity - (config.initial_capital + realized)).abs() < 1e-6);
    }

    #[test]
    fn replay_is_deterministic(
        returns in arb_returns(),
        actions in prop::collection::vec(arb_action(), 1..30),
        config in arb_config(),
    ) {
        let (_, a) = replay(&returns, &actions, &config);
        let (_, b) = replay(&returns, &actions, &config);
        prop_assert_eq!(a.trades, b.trades);
        prop_assert_eq!(a.equity_curve, b.equity_curve);
    }

    /// A losing exit can never cost more than margin plus commissions.
    #[test]
    fn loss_bounded_by_margin(
        entry in 10.0..500.0_f64,
        leverage in 1.0..50.0_f64,
        drop in 0.0..0.99_f64,
    ) {
        let config = ReplayConfig::new(10_000.0, 0).with_leverage(leverage).with_commission_rate(0.0);
        let mut pm = PositionManager::new(&config);
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        pm.apply(Action::Buy, entry, t0, 0);
        let low = entry * (1.0 - drop);
        let bar = Bar::new(t0 + Duration::hours(1), entry, entry, low, low, 1000.0);
        let trade = match pm.check_exits(&bar, 1) {
            Some(t) => t,
            None => pm.close(low, bar.timestamp, 1, replaylab_core::domain::ExitReason::Signal).unwrap(),
        };
        prop_assert!(trade.pnl >= -trade.margin_used - 1e-6);
    }
}
