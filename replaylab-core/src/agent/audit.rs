//! Prefix-stability audit for precomputed predictions.
//!
//! A series computation is causal iff truncating its input never changes an
//! earlier output. The audit recomputes on several prefixes and compares each
//! row against the full-series result.

use super::ml::SeriesPredictor;
use super::AgentError;
use crate::domain::Bar;
use serde::Serialize;

const TOLERANCE: f64 = 1e-9;

/// First row whose value depends on bars past its own index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CausalityViolation {
    /// Length of the prefix that produced a different value.
    pub prefix_len: usize,
    /// Row that changed.
    pub index: usize,
    pub full: Option<Vec<f64>>,
    pub truncated: Option<Vec<f64>>,
}

/// Audit a `SeriesPredictor` at the given prefix lengths.
///
/// Returns `Ok(None)` when every checked row is stable.
pub fn audit_prefix_stability<P: SeriesPredictor + ?Sized>(
    predictor: &P,
    bars: &[Bar],
    checkpoints: &[usize],
) -> Result<Option<CausalityViolation>, AgentError> {
    audit_with(|b| predictor.predict_series(b), bars, checkpoints)
}

/// Audit any per-bar series computation.
pub fn audit_with<F>(compute: F, bars: &[Bar], checkpoints: &[usize]) -> Result<Option<CausalityViolation>, AgentError>
where
    F: Fn(&[Bar]) -> Result<Vec<Option<Vec<f64>>>, AgentError>,
{
    let full = compute(bars)?;
    for &cut in checkpoints {
        if cut == 0 || cut > bars.len() {
            continue;
        }
        let truncated = compute(&bars[..cut])?;
        for index in 0..cut {
            let a = full.get(index).cloned().flatten();
            let b = truncated.get(index).cloned().flatten();
            if !rows_match(a.as_deref(), b.as_deref()) {
                return Ok(Some(CausalityViolation {
                    prefix_len: cut,
                    index,
                    full: a,
                    truncated: b,
                }));
            }
        }
    }
    Ok(None)
}

fn rows_match(a: Option<&[f64]>, b: Option<&[f64]>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.len() == b.len()
                && a.iter().zip(b).all(|(x, y)| (x.is_nan() && y.is_nan()) || (x - y).abs() <= TOLERANCE)
        }
        _ => false,
    }
}
