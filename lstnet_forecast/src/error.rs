//! Error types for the lstnet_forecast crate

use chrono::NaiveDateTime;
use polars::prelude::PolarsError;
use std::fmt;
use thiserror::Error;

/// Where a model call was aimed when it failed
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    /// Series ids covered by the request
    pub series_ids: Vec<usize>,
    /// First timestamp of the context window
    pub context_start: NaiveDateTime,
    /// First timestamp of the forecast horizon
    pub forecast_start: NaiveDateTime,
    pub context_length: usize,
    pub prediction_length: usize,
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = match (self.series_ids.first(), self.series_ids.last()) {
            (Some(first), Some(last)) if self.series_ids.len() > 1 => {
                format!("{}..={} ({} series)", first, last, self.series_ids.len())
            }
            (Some(only), _) => only.to_string(),
            _ => "none".to_string(),
        };
        write!(
            f,
            "series {}, context {} from {}, horizon {} from {}",
            ids,
            self.context_length,
            self.context_start,
            self.prediction_length,
            self.forecast_start
        )
    }
}

/// Custom error types for the lstnet_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The series is too short for the requested windows
    #[error("Insufficient history: need at least {needed} steps, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    /// A wire payload is malformed or missing a required field
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Array rank or extent does not match what the contract requires
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The model endpoint failed, timed out or returned an error status
    #[error("Remote call failed for {context}: {reason}")]
    RemoteCallFailure {
        context: Box<RequestContext>,
        reason: String,
    },

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from the numeric kernels
    #[error("Math error: {0}")]
    Math(#[from] series_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from JSON (de)serialization outside the wire protocol
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from CSV output
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
