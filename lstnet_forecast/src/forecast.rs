//! Forecast requests, sampled forecast paths and responses

use crate::data::{Dataset, Frequency};
use crate::error::{ForecastError, RequestContext, Result};
use crate::metrics::ItemMetrics;
use crate::normalize::ScaleFactors;
use crate::window::{Window, WindowSpec};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Sampled forecast paths laid out as `[sample][series][step]`
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePaths {
    data: Vec<Vec<Vec<f64>>>,
    num_series: usize,
    prediction_length: usize,
}

impl SamplePaths {
    /// Validate that every sample has the same series count and every path
    /// the same length
    pub fn new(data: Vec<Vec<Vec<f64>>>) -> Result<Self> {
        let first = data
            .first()
            .ok_or_else(|| ForecastError::ShapeMismatch("No forecast samples".to_string()))?;
        let num_series = first.len();
        let prediction_length = first.first().map(Vec::len).unwrap_or(0);
        if num_series == 0 || prediction_length == 0 {
            return Err(ForecastError::ShapeMismatch(
                "Forecast samples must cover at least one series and one step".to_string(),
            ));
        }

        for (s, sample) in data.iter().enumerate() {
            if sample.len() != num_series {
                return Err(ForecastError::ShapeMismatch(format!(
                    "Sample {} covers {} series, expected {}",
                    s,
                    sample.len(),
                    num_series
                )));
            }
            for (id, path) in sample.iter().enumerate() {
                if path.len() != prediction_length {
                    return Err(ForecastError::ShapeMismatch(format!(
                        "Sample {} series {} has {} steps, expected {}",
                        s,
                        id,
                        path.len(),
                        prediction_length
                    )));
                }
            }
        }

        Ok(Self {
            data,
            num_series,
            prediction_length,
        })
    }

    pub fn num_samples(&self) -> usize {
        self.data.len()
    }

    pub fn num_series(&self) -> usize {
        self.num_series
    }

    pub fn prediction_length(&self) -> usize {
        self.prediction_length
    }

    pub fn as_nested(&self) -> &[Vec<Vec<f64>>] {
        &self.data
    }

    /// Every sample path of one series
    pub fn series_paths(&self, series_id: usize) -> Result<Vec<&[f64]>> {
        if series_id >= self.num_series {
            return Err(ForecastError::ShapeMismatch(format!(
                "Series {} is not in a forecast of {} series",
                series_id, self.num_series
            )));
        }
        Ok(self
            .data
            .iter()
            .map(|sample| sample[series_id].as_slice())
            .collect())
    }

    /// Paths multiplied back by each series' scale
    pub fn denormalize(&self, scales: &ScaleFactors) -> Result<Self> {
        Self::new(scales.inverse_transform_samples(&self.data)?)
    }
}

/// Model input: the context history of every series plus optional covariates
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    target: Vec<Vec<f64>>,
    start: NaiveDateTime,
    covariates: Vec<Vec<f64>>,
    context: RequestContext,
}

impl ForecastRequest {
    /// Build a request from a series-major history matrix.
    ///
    /// Covariates, when present, must cover the same number of series as
    /// the target.
    pub fn new(
        target: Vec<Vec<f64>>,
        start: NaiveDateTime,
        covariates: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let history = target.first().map(Vec::len).unwrap_or(0);
        if target.is_empty() || history == 0 {
            return Err(ForecastError::ShapeMismatch(
                "Target history must cover at least one series and one step".to_string(),
            ));
        }
        if let Some((id, row)) = target.iter().enumerate().find(|(_, r)| r.len() != history) {
            return Err(ForecastError::ShapeMismatch(format!(
                "Target series {} has {} steps, expected {}",
                id,
                row.len(),
                history
            )));
        }

        if !covariates.is_empty() {
            if covariates.len() != target.len() {
                return Err(ForecastError::ShapeMismatch(format!(
                    "Target has {} series but covariates have {}",
                    target.len(),
                    covariates.len()
                )));
            }
            let cov_len = covariates[0].len();
            if let Some((id, row)) = covariates.iter().enumerate().find(|(_, r)| r.len() != cov_len) {
                return Err(ForecastError::ShapeMismatch(format!(
                    "Covariate {} has {} steps, expected {}",
                    id,
                    row.len(),
                    cov_len
                )));
            }
            if cov_len < history {
                return Err(ForecastError::ShapeMismatch(format!(
                    "Covariates have {} steps but the history has {}",
                    cov_len, history
                )));
            }
        }

        let context = RequestContext {
            series_ids: (0..target.len()).collect(),
            context_start: start,
            forecast_start: start,
            context_length: history,
            prediction_length: 0,
        };
        Ok(Self {
            target,
            start,
            covariates,
            context,
        })
    }

    /// Request for the context of `window`, taking covariates through the
    /// end of the target range so the model sees them over the horizon
    pub fn from_window(dataset: &Dataset, window: &Window) -> Result<Self> {
        let target = dataset
            .values()
            .into_iter()
            .map(|values| window.context(values).to_vec())
            .collect();
        let covariates = dataset
            .covariates()
            .map(|rows| {
                rows.iter()
                    .map(|row| row[window.bounds.context.start..window.bounds.target.end].to_vec())
                    .collect()
            })
            .unwrap_or_default();
        let mut request = Self::new(target, window.context_start, covariates)?;
        request.context.forecast_start = window.target_start;
        request.context.prediction_length = window.bounds.target.len();
        Ok(request)
    }

    /// Check the request against the lengths the model was trained with
    pub fn validate_for(&self, spec: &WindowSpec) -> Result<()> {
        if self.history_length() != spec.context_length() {
            return Err(ForecastError::ShapeMismatch(format!(
                "History has {} steps but the model expects context_length {}",
                self.history_length(),
                spec.context_length()
            )));
        }
        if let Some(cov_len) = self.covariates.first().map(Vec::len) {
            if cov_len != spec.context_length() && cov_len != spec.span() {
                return Err(ForecastError::ShapeMismatch(format!(
                    "Covariates have {} steps, expected {} or {}",
                    cov_len,
                    spec.context_length(),
                    spec.span()
                )));
            }
        }
        Ok(())
    }

    pub fn target(&self) -> &[Vec<f64>] {
        &self.target
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn covariates(&self) -> &[Vec<f64>] {
        &self.covariates
    }

    /// Series and window this request covers, for attributing failures
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn num_series(&self) -> usize {
        self.target.len()
    }

    pub fn history_length(&self) -> usize {
        self.target[0].len()
    }
}

/// Model output: sampled paths with their timeline and the endpoint's metrics
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResponse {
    pub samples: SamplePaths,
    /// Timestamp of the first forecast step
    pub start: NaiveDateTime,
    pub freq: Frequency,
    /// Aggregate metrics reported by the endpoint; `NaN` where it sent none
    pub agg_metrics: BTreeMap<String, f64>,
    /// Per-series metrics reported by the endpoint, when it had ground truth
    pub item_metrics: Vec<ItemMetrics>,
}

impl ForecastResponse {
    /// Response with no endpoint metrics attached
    pub fn new(samples: SamplePaths, start: NaiveDateTime, freq: Frequency) -> Self {
        Self {
            samples,
            start,
            freq,
            agg_metrics: BTreeMap::new(),
            item_metrics: Vec::new(),
        }
    }

    /// Timestamps of the forecast horizon
    pub fn timestamps(&self) -> Result<Vec<NaiveDateTime>> {
        (0..self.samples.prediction_length())
            .map(|i| self.freq.step(self.start, i))
            .collect()
    }

    /// Same response with samples in the original scale
    pub fn denormalized(&self, scales: &ScaleFactors) -> Result<Self> {
        Ok(Self {
            samples: self.samples.denormalize(scales)?,
            ..self.clone()
        })
    }
}
