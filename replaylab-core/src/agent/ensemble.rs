//! Weighted vote over member agents.

use super::{Agent, AgentContext, AgentError};
use crate::domain::{Action, Decision, LookbackView};
use tracing::debug;

/// Combines member decisions by weighted majority.
///
/// A member's vote counts `weight * confidence` (confidence defaults to 1).
/// The leading action wins only if it is strictly ahead of every other
/// action and holds at least `min_agreement` of the total weight; otherwise
/// the ensemble holds. A member that errors or returns a malformed decision
/// votes HOLD.
pub struct EnsembleAgent {
    name: String,
    members: Vec<(Box<dyn Agent>, f64)>,
    min_agreement: f64,
}

impl EnsembleAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            min_agreement: 0.5,
        }
    }

    pub fn with_member(mut self, agent: Box<dyn Agent>, weight: f64) -> Self {
        self.members.push((agent, weight.max(0.0)));
        self
    }

    pub fn with_min_agreement(mut self, min_agreement: f64) -> Self {
        self.min_agreement = min_agreement;
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

fn slot(action: Action) -> usize {
    match action {
        Action::Buy => 0,
        Action::Sell => 1,
        Action::Hold => 2,
        Action::Close => 3,
    }
}

impl Agent for EnsembleAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&self, window: LookbackView<'_>, context: &AgentContext) -> Result<Decision, AgentError> {
        let mut totals = [0.0f64; 4];
        let mut reasons = Vec::new();

        for (agent, weight) in &self.members {
            let decision = match agent.analyze(window, context).map(Decision::validate) {
                Ok(Ok(d)) => d,
                Ok(Err(defect)) => {
                    debug!(member = agent.name(), %defect, "member vote coerced to HOLD");
                    Decision::hold()
                }
                Err(err) => {
                    debug!(member = agent.name(), error = %err, "member vote coerced to HOLD");
                    Decision::hold()
                }
            };
            totals[slot(decision.action)] += weight * decision.confidence.unwrap_or(1.0);
            if let Some(r) = decision.reasoning {
                reasons.push(format!("{}: {r}", agent.name()));
            }
        }

        let total: f64 = totals.iter().sum();
        if total <= 0.0 {
            return Ok(Decision::hold().with_reasoning("no votes"));
        }

        let (best, best_weight) = Action::ALL
            .iter()
            .map(|&a| (a, totals[slot(a)]))
            .fold((Action::Hold, f64::NEG_INFINITY), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        let tied = Action::ALL
            .iter()
            .any(|&a| a != best && totals[slot(a)] == best_weight);
        let share = best_weight / total;

        if tied || share < self.min_agreement {
            return Ok(Decision::hold().with_reasoning(format!("no agreement (top share {share:.2})")));
        }

        let mut decision = Decision::new(best).with_confidence(share.clamp(0.0, 1.0));
        if !reasons.is_empty() {
            decision = decision.with_reasoning(reasons.join(" | "));
        }
        Ok(decision)
    }
}
