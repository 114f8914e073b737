//! Precomputing decorator: predict every bar once, then look up per call.

use super::ml::SeriesPredictor;
use super::policy::PredictionPolicy;
use super::{Agent, AgentContext, AgentError};
use crate::domain::{BarSeries, Decision, LookbackView};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Dense per-index predictions built ahead of the replay loop.
///
/// Prediction `i` comes from a `SeriesPredictor`, whose contract restricts it
/// to bars `[0..=i]`. The current position is applied at lookup time, so one
/// prepared agent serves any position path.
#[derive(Debug, Clone)]
pub struct PrecomputedAgent {
    name: String,
    predictions: Vec<Option<Vec<f64>>>,
    timestamps: Vec<DateTime<Utc>>,
    policy: PredictionPolicy,
}

impl PrecomputedAgent {
    pub fn prepare<P: SeriesPredictor + ?Sized>(
        predictor: &P,
        series: &BarSeries,
        policy: PredictionPolicy,
    ) -> Result<Self, AgentError> {
        let predictions = predictor.predict_series(series.bars())?;
        if predictions.len() != series.len() {
            return Err(AgentError::Other(format!(
                "predictor returned {} rows for {} bars",
                predictions.len(),
                series.len()
            )));
        }
        debug!(
            predictor = predictor.name(),
            bars = series.len(),
            ready = predictions.iter().filter(|p| p.is_some()).count(),
            "precomputed predictions"
        );
        Ok(Self {
            name: format!("{}_precomputed", predictor.name()),
            predictions,
            timestamps: series.bars().iter().map(|b| b.timestamp).collect(),
            policy,
        })
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    pub fn prediction(&self, index: usize) -> Option<&[f64]> {
        self.predictions.get(index).and_then(|p| p.as_deref())
    }
}

impl Agent for PrecomputedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&self, window: LookbackView<'_>, context: &AgentContext) -> Result<Decision, AgentError> {
        let index = window.index();
        let Some(&prepared_at) = self.timestamps.get(index) else {
            return Err(AgentError::Unavailable {
                index,
                reason: format!("only {} bars were prepared", self.timestamps.len()),
            });
        };
        if prepared_at != window.current().timestamp {
            return Err(AgentError::Unavailable {
                index,
                reason: format!(
                    "prepared for bar at {prepared_at}, asked about {}",
                    window.current().timestamp
                ),
            });
        }
        match &self.predictions[index] {
            Some(probs) => Ok(self.policy.decide(probs, context.position)),
            None => Ok(Decision::hold().with_reasoning("not enough data")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ml::tests::momentum_model;
    use crate::agent::{MlAgent, MlPredictor, OrderFlow};
    use crate::domain::{PositionSide, BarSeries};
    use crate::indicators::make_bars;

    fn wave_series(n: usize) -> BarSeries {
        let closes: Vec<f64> = (0..n)
            .map(|i| 100.0 + (i as f64 * 0.25).sin() * 4.0)
            .collect();
        BarSeries::new("T", make_bars(&closes)).unwrap()
    }

    #[test]
    fn matches_direct_agent_at_every_bar() {
        let series = wave_series(120);
        let predictor = MlPredictor::new(momentum_model()).unwrap();
        let policy = PredictionPolicy::default();
        let direct = MlAgent::new(predictor.clone(), policy);
        let fast = PrecomputedAgent::prepare(&predictor, &series, policy).unwrap();

        for position in [None, Some(PositionSide::Long), Some(PositionSide::Short)] {
            let ctx = AgentContext::new(OrderFlow::default(), position);
            for i in 0..series.len() {
                let w = series.window(i).unwrap();
                let a = direct.analyze(w, &ctx).unwrap();
                let b = fast.analyze(w, &ctx).unwrap();
                assert_eq!(a.action, b.action, "bar {i}, position {position:?}");
            }
        }
    }

    #[test]
    fn mismatched_series_is_rejected() {
        let series = wave_series(80);
        let predictor = MlPredictor::new(momentum_model()).unwrap();
        let fast = PrecomputedAgent::prepare(&predictor, &series, PredictionPolicy::default()).unwrap();

        let mut shifted = series.bars().to_vec();
        for b in &mut shifted {
            b.timestamp += chrono::Duration::minutes(1);
        }
        let other = BarSeries::new("T", shifted).unwrap();
        let ctx = AgentContext::default();
        assert!(fast.analyze(other.window(70).unwrap(), &ctx).is_err());

        let longer = wave_series(90);
        assert!(fast.analyze(longer.window(85).unwrap(), &ctx).is_err());
    }
}
