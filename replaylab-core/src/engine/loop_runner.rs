//! Bar-by-bar replay loop.
//!
//! Per bar, in order:
//! 1. Mark the open position at the bar's close
//! 2. Protective exits (stop-loss, liquidation, take-profit) against high/low
//! 3. Consult the agent once warm, via the causal window only
//! 4. Apply the decision at the bar's close
//! 5. On the final bar, close anything still open (`end_of_data`)
//! 6. Append one equity point

use super::accounting::{EquityCurve, TradeLedger};
use super::cancel::CancelToken;
use super::error::ReplayError;
use super::position_manager::{PositionManager, Transition};
use super::state::{DecisionRecord, ReplayConfig, ReplayResult};
use super::warmup::WarmupGate;
use crate::agent::{Agent, AgentContext};
use crate::domain::{BarSeries, Decision, EquityPoint, ExitReason};
use tracing::{debug, info, warn};

/// Replay `agent` over `series` under `config`.
///
/// Fails before the loop starts when the config is invalid or the series is
/// shorter than `warmup_bars`. Everything else, including agent failures and
/// liquidation, is a normal outcome recorded in the result.
///
/// When `cancel` fires, the loop stops before the next bar and returns what
/// was completed. The open position, if any, is reported but not closed.
pub fn run_replay(
    series: &BarSeries,
    agent: &dyn Agent,
    config: &ReplayConfig,
    cancel: Option<&CancelToken>,
) -> Result<ReplayResult, ReplayError> {
    config.validate()?;
    let num_bars = series.len();
    if num_bars < config.warmup_bars {
        return Err(ReplayError::InsufficientHistory {
            required: config.warmup_bars,
            available: num_bars,
        });
    }

    info!(
        symbol = series.symbol(),
        agent = agent.name(),
        bars = num_bars,
        warmup = config.warmup_bars,
        "replay started"
    );

    let mut pm = PositionManager::new(config);
    let mut warmup = WarmupGate::new(config.warmup_bars);
    let mut ledger = TradeLedger::new();
    let mut equity = EquityCurve::with_capacity(num_bars);
    let mut decisions = Vec::new();
    let mut last_mark: Option<f64> = None;
    let mut invalid_bars = 0;
    let mut malformed_decisions = 0;
    let mut cancelled = false;

    for (i, bar) in series.bars().iter().enumerate() {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            cancelled = true;
            break;
        }
        let warm = warmup.admit();

        if bar.has_finite_prices() {
            last_mark = Some(bar.close);

            if let Some(trade) = pm.check_exits(bar, i) {
                debug!(bar = i, reason = %trade.exit_reason, price = trade.exit_price, pnl = trade.pnl, "position closed");
                ledger.record(trade);
            }

            if warm {
                // `i` is always in range here; `window` only returns None past the end.
                if let Some(window) = series.window(i) {
                    let context = AgentContext::from_window(&window, pm.side());
                    let decision = match agent.analyze(window, &context).map(Decision::validate) {
                        Ok(Ok(decision)) => decision,
                        Ok(Err(defect)) => {
                            malformed_decisions += 1;
                            warn!(bar = i, agent = agent.name(), %defect, "malformed decision treated as HOLD");
                            Decision::hold()
                        }
                        Err(err) => {
                            malformed_decisions += 1;
                            warn!(bar = i, agent = agent.name(), error = %err, "agent failed, treated as HOLD");
                            Decision::hold()
                        }
                    };

                    if !decision.is_hold() {
                        match pm.apply(decision.action, bar.close, bar.timestamp, i) {
                            Transition::Opened(side) => {
                                debug!(bar = i, %side, price = bar.close, "position opened");
                            }
                            Transition::Closed(trade) => {
                                debug!(bar = i, reason = %trade.exit_reason, price = trade.exit_price, pnl = trade.pnl, "position closed");
                                ledger.record(trade);
                            }
                            Transition::Unchanged => {}
                        }
                        decisions.push(DecisionRecord {
                            bar_index: i,
                            timestamp: bar.timestamp,
                            price: bar.close,
                            decision,
                            position_after: pm.side(),
                        });
                    }
                }
            }
        } else {
            invalid_bars += 1;
            warn!(bar = i, timestamp = %bar.timestamp, "non-finite prices, bar skipped");
        }

        if i + 1 == num_bars {
            if let Some(mark) = last_mark {
                if let Some(trade) = pm.close(mark, bar.timestamp, i, ExitReason::EndOfData) {
                    debug!(bar = i, price = mark, pnl = trade.pnl, "position closed at end of data");
                    ledger.record(trade);
                }
            }
        }

        let unrealized_pnl = last_mark.map_or(0.0, |mark| pm.unrealized_pnl(mark));
        equity.push(EquityPoint {
            timestamp: bar.timestamp,
            cash: pm.cash(),
            unrealized_pnl,
            equity: pm.cash() + unrealized_pnl,
        });
    }

    let final_equity = equity.last_equity().unwrap_or(config.initial_capital);
    if cancelled {
        info!(bars_processed = equity.len(), trades = ledger.len(), "replay cancelled");
    } else {
        info!(trades = ledger.len(), final_equity, invalid_bars, malformed_decisions, "replay finished");
    }

    Ok(ReplayResult {
        symbol: series.symbol().to_string(),
        agent: agent.name().to_string(),
        initial_capital: config.initial_capital,
        trades: ledger.into_trades(),
        equity_curve: equity.into_points(),
        decisions,
        final_equity,
        bar_count: num_bars,
        warmup_bars: config.warmup_bars,
        invalid_bars,
        malformed_decisions,
        cancelled,
        open_position: if cancelled { pm.position().cloned() } else { None },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentError, ScheduledAgent};
    use crate::domain::{Action, LookbackView, PositionSide};
    use crate::indicators::make_bars;

    fn flat_series(n: usize) -> BarSeries {
        BarSeries::new("TEST", make_bars(&vec![100.0; n])).unwrap()
    }

    fn config() -> ReplayConfig {
        ReplayConfig::new(10_000.0, 0)
            .with_position_size_pct(1.0)
            .with_commission_rate(0.0)
    }

    struct Failing;

    impl Agent for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn analyze(&self, window: LookbackView<'_>, _: &AgentContext) -> Result<Decision, AgentError> {
            Err(AgentError::Other(format!("boom at {}", window.index())))
        }
    }

    #[test]
    fn one_equity_point_per_bar() {
        let series = flat_series(25);
        let result = run_replay(&series, &ScheduledAgent::new("idle"), &config(), None).unwrap();
        assert_eq!(result.equity_curve.len(), 25);
        assert!(result.trades.is_empty());
        assert_eq!(result.final_equity, 10_000.0);
    }

    #[test]
    fn insufficient_history_aborts() {
        let series = flat_series(5);
        let cfg = config();
        let cfg = ReplayConfig { warmup_bars: 6, ..cfg };
        let err = run_replay(&series, &ScheduledAgent::new("idle"), &cfg, None).unwrap_err();
        assert_eq!(err, ReplayError::InsufficientHistory { required: 6, available: 5 });
    }

    #[test]
    fn empty_series_with_zero_warmup() {
        let series = BarSeries::new("EMPTY", Vec::new()).unwrap();
        let result = run_replay(&series, &ScheduledAgent::new("idle"), &config(), None).unwrap();
        assert!(result.equity_curve.is_empty());
        assert_eq!(result.final_equity, 10_000.0);
    }

    #[test]
    fn agent_errors_count_as_hold() {
        let series = flat_series(10);
        let result = run_replay(&series, &Failing, &config(), None).unwrap();
        assert_eq!(result.malformed_decisions, 10);
        assert!(result.trades.is_empty());
        assert!(result.decisions.is_empty());
    }

    #[test]
    fn agent_not_consulted_during_warmup() {
        let series = flat_series(10);
        let cfg = ReplayConfig { warmup_bars: 4, ..config() };
        let result = run_replay(&series, &Failing, &cfg, None).unwrap();
        // Consulted from index 3 onward.
        assert_eq!(result.malformed_decisions, 7);
    }

    #[test]
    fn decision_log_records_resulting_side() {
        let series = flat_series(10);
        let agent: ScheduledAgent = [
            (series.get(2).unwrap().timestamp, Action::Sell),
            (series.get(5).unwrap().timestamp, Action::Close),
        ]
        .into_iter()
        .collect();
        let result = run_replay(&series, &agent, &config(), None).unwrap();
        assert_eq!(result.decisions.len(), 2);
        assert_eq!(result.decisions[0].position_after, Some(PositionSide::Short));
        assert_eq!(result.decisions[1].position_after, None);
        assert_eq!(result.trades.len(), 1);
    }

    #[test]
    fn cancelled_before_start_returns_empty_result() {
        let series = flat_series(10);
        let token = CancelToken::new();
        token.cancel();
        let result = run_replay(&series, &ScheduledAgent::new("idle"), &config(), Some(&token)).unwrap();
        assert!(result.cancelled);
        assert!(result.equity_curve.is_empty());
        assert_eq!(result.bars_processed(), 0);
    }
}
