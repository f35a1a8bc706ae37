//! Max-absolute scaling
//!
//! Each series is divided by the largest absolute value observed in its
//! training segment, so normalized values fall in `[-1, 1]` on that segment.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Scale derived from one training segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScaleOutcome {
    /// A positive scale taken from the data
    Fitted(f64),
    /// The segment was all zeros; the unit scale stands in
    Degenerate,
}

impl ScaleOutcome {
    /// The divisor to use, always strictly positive
    pub fn value(&self) -> f64 {
        match self {
            ScaleOutcome::Fitted(scale) => *scale,
            ScaleOutcome::Degenerate => 1.0,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, ScaleOutcome::Degenerate)
    }
}

/// Compute the max-absolute scale of a training segment
pub fn max_abs_scale(values: &[f64]) -> Result<ScaleOutcome> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot fit a scale on an empty segment".to_string(),
        ));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(format!(
            "Non-finite value {} in training segment",
            bad
        )));
    }

    let max_abs = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if max_abs > 0.0 {
        Ok(ScaleOutcome::Fitted(max_abs))
    } else {
        Ok(ScaleOutcome::Degenerate)
    }
}

/// Divide every value by `scale`
pub fn scale_values(values: &[f64], scale: f64) -> Result<Vec<f64>> {
    check_scale(scale)?;
    Ok(values.iter().map(|v| v / scale).collect())
}

/// Multiply every value by `scale`, undoing [`scale_values`]
pub fn unscale_values(values: &[f64], scale: f64) -> Result<Vec<f64>> {
    check_scale(scale)?;
    Ok(values.iter().map(|v| v * scale).collect())
}

fn check_scale(scale: f64) -> Result<()> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(MathError::InvalidInput(format!(
            "Scale must be a positive finite number, got {}",
            scale
        )));
    }
    Ok(())
}
