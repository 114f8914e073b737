//! Turns class probabilities into a position-aware decision.

use crate::domain::{Decision, PositionSide};
use serde::{Deserialize, Serialize};

/// Class order for multi-class models; index 0 is hold.
const CLASS_LONG: usize = 1;
const CLASS_SHORT: usize = 2;
const CLASS_CLOSE: usize = 3;

/// Thresholds applied to model output.
///
/// Binary models produce `[p_down, p_up]`. Multi-class models produce
/// `[hold, long, short]` with an optional fourth `close` class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionPolicy {
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    /// Multi-class only: the winning class needs at least this probability.
    pub min_confidence: f64,
}

impl Default for PredictionPolicy {
    fn default() -> Self {
        Self {
            buy_threshold: 0.55,
            sell_threshold: 0.45,
            min_confidence: 0.40,
        }
    }
}

impl PredictionPolicy {
    pub fn decide(&self, probs: &[f64], position: Option<PositionSide>) -> Decision {
        match probs.len() {
            0 | 1 => Decision::hold().with_reasoning("no usable prediction"),
            2 => self.decide_binary(probs[1], position),
            _ => self.decide_multiclass(probs, position),
        }
    }

    fn decide_binary(&self, p_up: f64, position: Option<PositionSide>) -> Decision {
        let p_down = 1.0 - p_up;
        match position {
            Some(PositionSide::Long) if p_up < 0.5 => Decision::close()
                .with_confidence(p_down)
                .with_reasoning(format!("close long: p_up={p_up:.2}")),
            Some(PositionSide::Short) if p_up > 0.5 => Decision::close()
                .with_confidence(p_up)
                .with_reasoning(format!("close short: p_up={p_up:.2}")),
            Some(side) => Decision::hold().with_reasoning(format!("hold {side}: p_up={p_up:.2}")),
            None if p_up >= self.buy_threshold => Decision::buy()
                .with_confidence(p_up)
                .with_reasoning(format!("open long: p_up={p_up:.2}")),
            None if p_up <= self.sell_threshold => Decision::sell()
                .with_confidence(p_down)
                .with_reasoning(format!("open short: p_up={p_up:.2}")),
            None => Decision::hold().with_reasoning(format!("flat: p_up={p_up:.2}")),
        }
    }

    fn decide_multiclass(&self, probs: &[f64], position: Option<PositionSide>) -> Decision {
        // First maximum wins ties, so class order is the tie-break.
        let (class, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });

        if confidence < self.min_confidence {
            return Decision::hold().with_reasoning(format!(
                "low confidence: {confidence:.2} < {}",
                self.min_confidence
            ));
        }

        let decision = match (class, position) {
            (CLASS_LONG, None) => Decision::buy(),
            (CLASS_LONG, Some(PositionSide::Short)) => Decision::close(),
            (CLASS_SHORT, None) => Decision::sell(),
            (CLASS_SHORT, Some(PositionSide::Long)) => Decision::close(),
            (CLASS_CLOSE, Some(_)) => Decision::close(),
            _ => Decision::hold(),
        };
        decision
            .with_confidence(confidence)
            .with_reasoning(format!("class {class} p={confidence:.2}"))
    }
}
