//! Context / prediction windows over a series
//!
//! A window starting at step `t` uses `[t, t + context_length)` as model input
//! and `[t + context_length, t + context_length + prediction_length)` as the
//! target. Windows carry the timestamp of their first target step because
//! downstream consumers realign forecasts by time, not by step index.

use crate::data::Dataset;
use crate::error::{ForecastError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Context and prediction lengths, both at least 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindowSpec")]
pub struct WindowSpec {
    context_length: usize,
    prediction_length: usize,
}

#[derive(Deserialize)]
struct RawWindowSpec {
    context_length: usize,
    prediction_length: usize,
}

impl TryFrom<RawWindowSpec> for WindowSpec {
    type Error = ForecastError;

    fn try_from(raw: RawWindowSpec) -> Result<Self> {
        Self::new(raw.context_length, raw.prediction_length)
    }
}

impl WindowSpec {
    pub fn new(context_length: usize, prediction_length: usize) -> Result<Self> {
        if context_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "context_length must be at least 1".to_string(),
            ));
        }
        if prediction_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "prediction_length must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            context_length,
            prediction_length,
        })
    }

    pub fn context_length(&self) -> usize {
        self.context_length
    }

    pub fn prediction_length(&self) -> usize {
        self.prediction_length
    }

    /// Steps one window spans
    pub fn span(&self) -> usize {
        self.context_length + self.prediction_length
    }

    /// Index bounds of the window starting at `offset`
    pub fn window_at(&self, offset: usize) -> WindowBounds {
        let split = offset + self.context_length;
        WindowBounds {
            context: offset..split,
            target: split..split + self.prediction_length,
        }
    }

    /// Number of complete windows in a series of `series_len` steps
    pub fn count(&self, series_len: usize) -> Result<usize> {
        if series_len < self.span() {
            return Err(ForecastError::InsufficientHistory {
                needed: self.span(),
                got: series_len,
            });
        }
        Ok(series_len - self.span() + 1)
    }

    /// Every complete window, in order of start step
    pub fn training_windows(&self, series_len: usize) -> Result<Vec<WindowBounds>> {
        let count = self.count(series_len)?;
        Ok((0..count).map(|offset| self.window_at(offset)).collect())
    }

    /// The window whose target is the last `prediction_length` steps
    pub fn evaluation_window(&self, series_len: usize) -> Result<WindowBounds> {
        let count = self.count(series_len)?;
        Ok(self.window_at(count - 1))
    }

    /// Windows over a dataset with the target start timestamp of each
    pub fn plan(&self, dataset: &Dataset) -> Result<WindowPlan> {
        let annotate = |bounds: WindowBounds| -> Result<Window> {
            Ok(Window {
                context_start: dataset.timestamp_at(bounds.context.start)?,
                target_start: dataset.timestamp_at(bounds.target.start)?,
                bounds,
            })
        };

        let training = self
            .training_windows(dataset.len())?
            .into_iter()
            .map(annotate)
            .collect::<Result<Vec<_>>>()?;
        let evaluation = annotate(self.evaluation_window(dataset.len())?)?;

        Ok(WindowPlan {
            spec: *self,
            training,
            evaluation,
        })
    }
}

/// Index ranges of one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowBounds {
    pub context: Range<usize>,
    pub target: Range<usize>,
}

/// A window placed on the timestamp grid
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub bounds: WindowBounds,
    pub context_start: NaiveDateTime,
    /// Timestamp of the first forecast step
    pub target_start: NaiveDateTime,
}

impl Window {
    /// Context slice of `values`
    pub fn context<'a>(&self, values: &'a [f64]) -> &'a [f64] {
        &values[self.bounds.context.clone()]
    }

    /// Target slice of `values`
    pub fn target<'a>(&self, values: &'a [f64]) -> &'a [f64] {
        &values[self.bounds.target.clone()]
    }
}

/// All windows of one dataset
#[derive(Debug, Clone)]
pub struct WindowPlan {
    pub spec: WindowSpec,
    pub training: Vec<Window>,
    pub evaluation: Window,
}
