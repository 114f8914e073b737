//! Model-driven prediction and the direct ML agent.

use super::model::{ModelError, ProbabilityModel};
use super::policy::PredictionPolicy;
use super::{Agent, AgentContext, AgentError};
use crate::domain::{Bar, Decision, LookbackView};
use crate::features::FeatureEngineer;
use std::sync::Arc;

/// Produces one class-probability vector per bar.
///
/// # Causality contract
/// Element `t` of `predict_series(bars)` may depend only on `bars[..=t]`.
/// Truncating the input must never change an earlier element; see
/// `audit_prefix_stability`.
pub trait SeriesPredictor: Send + Sync {
    fn name(&self) -> &str;

    /// `None` where the predictor has too little history.
    fn predict_series(&self, bars: &[Bar]) -> Result<Vec<Option<Vec<f64>>>, AgentError>;

    /// Prediction for the last bar only.
    fn predict_last(&self, bars: &[Bar]) -> Result<Option<Vec<f64>>, AgentError> {
        Ok(self.predict_series(bars)?.pop().flatten())
    }
}

/// Default number of bars before the model is consulted.
pub const DEFAULT_MIN_BARS: usize = 60;

/// Features from `FeatureEngineer`, probabilities from a `ProbabilityModel`.
#[derive(Clone)]
pub struct MlPredictor {
    engineer: FeatureEngineer,
    model: Arc<dyn ProbabilityModel>,
    min_bars: usize,
    name: String,
}

impl std::fmt::Debug for MlPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlPredictor")
            .field("name", &self.name)
            .field("min_bars", &self.min_bars)
            .field("n_classes", &self.model.n_classes())
            .finish()
    }
}

impl MlPredictor {
    /// Fails when the model was trained on different feature columns.
    pub fn new(model: Arc<dyn ProbabilityModel>) -> Result<Self, ModelError> {
        let engineer = FeatureEngineer::new();
        model.check_features(&engineer.feature_names())?;
        Ok(Self {
            engineer,
            model,
            min_bars: DEFAULT_MIN_BARS,
            name: "ml".to_string(),
        })
    }

    pub fn with_min_bars(mut self, min_bars: usize) -> Self {
        self.min_bars = min_bars;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn min_bars(&self) -> usize {
        self.min_bars
    }
}

impl SeriesPredictor for MlPredictor {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_series(&self, bars: &[Bar]) -> Result<Vec<Option<Vec<f64>>>, AgentError> {
        let features = self.engineer.compute(bars);
        features
            .rows()
            .iter()
            .enumerate()
            .map(|(t, row)| -> Result<Option<Vec<f64>>, AgentError> {
                if t + 1 < self.min_bars {
                    Ok(None)
                } else {
                    Ok(Some(self.model.predict_proba(row)?))
                }
            })
            .collect()
    }

    fn predict_last(&self, bars: &[Bar]) -> Result<Option<Vec<f64>>, AgentError> {
        if bars.len() < self.min_bars.max(1) {
            return Ok(None);
        }
        let features = self.engineer.compute(bars);
        match features.last_row() {
            Some(row) => Ok(Some(self.model.predict_proba(row)?)),
            None => Ok(None),
        }
    }
}

/// Direct ML agent: recomputes features over the window on every call.
#[derive(Debug, Clone)]
pub struct MlAgent {
    predictor: MlPredictor,
    policy: PredictionPolicy,
}

impl MlAgent {
    pub fn new(predictor: MlPredictor, policy: PredictionPolicy) -> Self {
        Self { predictor, policy }
    }
}

impl Agent for MlAgent {
    fn name(&self) -> &str {
        self.predictor.name()
    }

    fn analyze(&self, window: LookbackView<'_>, context: &AgentContext) -> Result<Decision, AgentError> {
        match self.predictor.predict_last(window.bars())? {
            Some(probs) => Ok(self.policy.decide(&probs, context.position)),
            None => Ok(Decision::hold().with_reasoning("not enough data")),
        }
    }
}
