//! # Series Math
//!
//! Numeric kernels shared by the forecasting pipeline.
//! This crate provides the scaling rule used to normalize each series,
//! the error sums behind the accuracy metrics and summary statistics over
//! sampled forecast paths.

use thiserror::Error;

pub mod accuracy;
pub mod sampling;
pub mod scaling;

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Fail unless both slices are non-empty and of equal length.
pub(crate) fn check_paired(actual: &[f64], forecast: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot score an empty series".to_string(),
        ));
    }
    if actual.len() != forecast.len() {
        return Err(MathError::LengthMismatch {
            expected: actual.len(),
            got: forecast.len(),
        });
    }
    Ok(())
}
