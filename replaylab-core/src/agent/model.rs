//! Probability models over feature rows.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model shape: {0}")]
    InvalidShape(String),

    #[error("expected {expected} features, got {found}")]
    FeatureCount { expected: usize, found: usize },

    #[error("feature {position} is '{found}', model expects '{expected}'")]
    FeatureMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("model produced non-finite probabilities")]
    NonFinite,

    #[error("failed to parse model: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Maps one feature row to class probabilities that sum to 1.
pub trait ProbabilityModel: Send + Sync {
    /// Feature names, in the order `predict_proba` expects them.
    fn feature_names(&self) -> &[String];

    fn n_classes(&self) -> usize;

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;

    /// Verify the model was trained on exactly these columns.
    fn check_features(&self, names: &[String]) -> Result<(), ModelError> {
        let expected = self.feature_names();
        if expected.len() != names.len() {
            return Err(ModelError::FeatureCount {
                expected: expected.len(),
                found: names.len(),
            });
        }
        for (position, (e, f)) in expected.iter().zip(names).enumerate() {
            if e != f {
                return Err(ModelError::FeatureMismatch {
                    position,
                    expected: e.clone(),
                    found: f.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Linear classifier stored as JSON.
///
/// One weight row is a binary logistic model returning `[p_down, p_up]`.
/// Two or more rows are a softmax over that many classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub feature_names: Vec<String>,
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl LinearModel {
    pub fn new(feature_names: Vec<String>, weights: Vec<Vec<f64>>, bias: Vec<f64>) -> Result<Self, ModelError> {
        let model = Self {
            feature_names,
            weights,
            bias,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.weights.is_empty() {
            return Err(ModelError::InvalidShape("no weight rows".into()));
        }
        if self.bias.len() != self.weights.len() {
            return Err(ModelError::InvalidShape(format!(
                "{} weight rows but {} bias terms",
                self.weights.len(),
                self.bias.len()
            )));
        }
        let width = self.feature_names.len();
        if let Some((row, w)) = self.weights.iter().enumerate().find(|(_, w)| w.len() != width) {
            return Err(ModelError::InvalidShape(format!(
                "weight row {row} has {} entries, expected {width}",
                w.len()
            )));
        }
        let all_finite = self
            .weights
            .iter()
            .flatten()
            .chain(&self.bias)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(ModelError::InvalidShape("non-finite parameter".into()));
        }
        Ok(())
    }

    fn logits(&self, features: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| b + w.iter().zip(features).map(|(wi, xi)| wi * xi).sum::<f64>())
            .collect()
    }
}

impl ProbabilityModel for LinearModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn n_classes(&self) -> usize {
        if self.weights.len() == 1 {
            2
        } else {
            self.weights.len()
        }
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if features.len() != self.feature_names.len() {
            return Err(ModelError::FeatureCount {
                expected: self.feature_names.len(),
                found: features.len(),
            });
        }
        let logits = self.logits(features);
        let probs = if logits.len() == 1 {
            let p = 1.0 / (1.0 + (-logits[0]).exp());
            vec![1.0 - p, p]
        } else {
            let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = logits.iter().map(|z| (z - max).exp()).collect();
            let total: f64 = exps.iter().sum();
            exps.into_iter().map(|e| e / total).collect()
        };
        if probs.iter().all(|p| p.is_finite()) {
            Ok(probs)
        } else {
            Err(ModelError::NonFinite)
        }
    }
}
