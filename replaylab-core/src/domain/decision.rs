//! Decision: the pure output of one agent call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the agent wants done at the current bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
    Close,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Buy, Action::Sell, Action::Hold, Action::Close];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
            Action::Close => "CLOSE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trading decision. Carries no side effects; the engine decides what it means
/// given the current position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    /// Conviction in [0, 1], when the agent can express one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Free-form explanation. Plain data; never logged by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Why a decision was rejected as malformed.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionDefect {
    ConfidenceOutOfRange(f64),
}

impl fmt::Display for DecisionDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionDefect::ConfidenceOutOfRange(c) => {
                write!(f, "confidence {c} is not a finite value in [0, 1]")
            }
        }
    }
}

impl Decision {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            confidence: None,
            reasoning: None,
        }
    }

    pub fn hold() -> Self {
        Self::new(Action::Hold)
    }

    pub fn buy() -> Self {
        Self::new(Action::Buy)
    }

    pub fn sell() -> Self {
        Self::new(Action::Sell)
    }

    pub fn close() -> Self {
        Self::new(Action::Close)
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn is_hold(&self) -> bool {
        self.action == Action::Hold
    }

    /// Check the decision is well-formed.
    pub fn validate(self) -> Result<Self, DecisionDefect> {
        if let Some(c) = self.confidence {
            if !c.is_finite() || !(0.0..=1.0).contains(&c) {
                return Err(DecisionDefect::ConfidenceOutOfRange(c));
            }
        }
        Ok(self)
    }
}

impl Default for Decision {
    fn default() -> Self {
        Self::hold()
    }
}
