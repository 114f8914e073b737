//! Rule-based agents. Each recomputes what it needs from the window on every call.

use super::{Agent, AgentContext, AgentError};
use crate::domain::{Decision, LookbackView, PositionSide};
use crate::indicators::{ewm, Ema, EwmMode, Indicator, Supertrend, TrendDirection};
use serde::{Deserialize, Serialize};

// ─── Momentum ───────────────────────────────────────────────────────

/// Trades the percent change of close over a fixed lookback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumAgent {
    pub lookback: usize,
    /// Entry threshold in percent.
    pub threshold_pct: f64,
}

impl Default for MomentumAgent {
    fn default() -> Self {
        Self {
            lookback: 10,
            threshold_pct: 1.0,
        }
    }
}

impl MomentumAgent {
    pub fn new(lookback: usize, threshold_pct: f64) -> Self {
        Self {
            lookback,
            threshold_pct,
        }
    }
}

impl Agent for MomentumAgent {
    fn name(&self) -> &str {
        "momentum"
    }

    fn analyze(&self, window: LookbackView<'_>, context: &AgentContext) -> Result<Decision, AgentError> {
        if window.len() < self.lookback + 5 {
            return Ok(Decision::hold().with_reasoning("not enough data"));
        }
        let current = window.current().close;
        let past = match window.back(self.lookback) {
            Some(bar) if bar.close.is_finite() && bar.close != 0.0 => bar.close,
            _ => return Ok(Decision::hold()),
        };
        let momentum = (current - past) / past * 100.0;

        let decision = match context.position {
            None if momentum > self.threshold_pct => {
                Decision::buy().with_reasoning(format!("momentum up {momentum:.2}% > {}%", self.threshold_pct))
            }
            None if momentum < -self.threshold_pct => {
                Decision::sell().with_reasoning(format!("momentum down {momentum:.2}% < -{}%", self.threshold_pct))
            }
            Some(PositionSide::Long) if momentum < 0.0 => {
                Decision::close().with_reasoning(format!("exit long: momentum reversed ({momentum:.2}%)"))
            }
            Some(PositionSide::Short) if momentum > 0.0 => {
                Decision::close().with_reasoning(format!("exit short: momentum reversed ({momentum:.2}%)"))
            }
            _ => Decision::hold().with_reasoning(format!("momentum {momentum:.2}%")),
        };
        Ok(decision)
    }
}

// ─── Order flow ─────────────────────────────────────────────────────

/// Enters on high-volume bars whose signed volume and momentum agree with
/// the EMA20/EMA50 trend; exits when flow turns against the position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderFlowAgent {
    pub cvd_threshold: f64,
    pub volume_threshold: f64,
    pub momentum_threshold: f64,
}

impl Default for OrderFlowAgent {
    fn default() -> Self {
        Self {
            cvd_threshold: 1000.0,
            volume_threshold: 1.5,
            momentum_threshold: 0.5,
        }
    }
}

const ORDER_FLOW_MIN_BARS: usize = 20;

impl Agent for OrderFlowAgent {
    fn name(&self) -> &str {
        "order_flow"
    }

    fn analyze(&self, window: LookbackView<'_>, context: &AgentContext) -> Result<Decision, AgentError> {
        if window.len() < ORDER_FLOW_MIN_BARS {
            return Ok(Decision::hold().with_reasoning("not enough data"));
        }
        let flow = context.order_flow;

        let closes = window.closes();
        let ema20 = ewm(&closes, 20, EwmMode::Adjusted).last().copied().unwrap_or(f64::NAN);
        let ema50 = if closes.len() >= 50 {
            ewm(&closes, 50, EwmMode::Adjusted).last().copied().unwrap_or(f64::NAN)
        } else {
            ema20
        };
        let uptrend = ema20 > ema50;
        let downtrend = ema20 < ema50;
        let high_volume = flow.volume_ratio > self.volume_threshold;

        if context.position != Some(PositionSide::Long)
            && high_volume
            && flow.cvd > self.cvd_threshold
            && flow.momentum > self.momentum_threshold
            && uptrend
        {
            return Ok(Decision::buy().with_reasoning(format!(
                "high volume ({:.1}x) | cvd {:.0} | momentum {:.2}% | ema20 > ema50",
                flow.volume_ratio, flow.cvd, flow.momentum
            )));
        }

        if context.position != Some(PositionSide::Short)
            && high_volume
            && flow.cvd < -self.cvd_threshold
            && flow.momentum < -self.momentum_threshold
            && downtrend
        {
            return Ok(Decision::sell().with_reasoning(format!(
                "high volume ({:.1}x) | cvd {:.0} | momentum {:.2}% | ema20 < ema50",
                flow.volume_ratio, flow.cvd, flow.momentum
            )));
        }

        let decision = match context.position {
            Some(PositionSide::Long) if flow.cvd < 0.0 || flow.momentum < -self.momentum_threshold => {
                Decision::close().with_reasoning(format!("exit long: cvd {:.0}", flow.cvd))
            }
            Some(PositionSide::Short) if flow.cvd > 0.0 || flow.momentum > self.momentum_threshold => {
                Decision::close().with_reasoning(format!("exit short: cvd {:.0}", flow.cvd))
            }
            _ => Decision::hold(),
        };
        Ok(decision)
    }
}

// ─── Trend zone ─────────────────────────────────────────────────────

/// Reversal entries on Supertrend flips confirmed by two EMAs.
///
/// BUY when Supertrend flips up and the close is above both EMAs; SELL on
/// the mirror image. An open position is closed once Supertrend points
/// against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendZoneAgent {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub supertrend_period: usize,
    pub supertrend_multiplier: f64,
}

impl Default for TrendZoneAgent {
    fn default() -> Self {
        Self {
            ema_fast: 21,
            ema_slow: 50,
            supertrend_period: 12,
            supertrend_multiplier: 3.0,
        }
    }
}

impl Agent for TrendZoneAgent {
    fn name(&self) -> &str {
        "trend_zone"
    }

    fn analyze(&self, window: LookbackView<'_>, context: &AgentContext) -> Result<Decision, AgentError> {
        let min_bars = self.ema_slow.max(self.supertrend_period) + 1;
        if window.len() < min_bars {
            return Ok(Decision::hold().with_reasoning("not enough data"));
        }

        let bars = window.bars();
        let i = window.index();
        let fast = Ema::new(self.ema_fast).compute(bars)[i];
        let slow = Ema::new(self.ema_slow).compute(bars)[i];
        let st = Supertrend::new(self.supertrend_period, self.supertrend_multiplier).compute_series(bars);
        let price = window.current().close;

        let Some(direction) = st.direction[i] else {
            return Ok(Decision::hold());
        };

        let decision = match context.position {
            None if st.flipped_up(i) && price > fast && price > slow => {
                Decision::buy().with_reasoning("supertrend flipped up above both EMAs")
            }
            None if st.flipped_down(i) && price < fast && price < slow => {
                Decision::sell().with_reasoning("supertrend flipped down below both EMAs")
            }
            Some(PositionSide::Long) if direction == TrendDirection::Down => {
                Decision::close().with_reasoning("supertrend turned down")
            }
            Some(PositionSide::Short) if direction == TrendDirection::Up => {
                Decision::close().with_reasoning("supertrend turned up")
            }
            _ => Decision::hold(),
        };
        Ok(decision)
    }
}
