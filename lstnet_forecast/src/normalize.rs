//! Per-series max-absolute normalization
//!
//! Scale factors are fitted once on the training split and then passed by
//! value to every transform. They are never refitted on test data, so test
//! metrics cannot leak information from the held-out tail.

use crate::data::Dataset;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use series_math::scaling::{max_abs_scale, scale_values, unscale_values};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// One positive divisor per series id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactors {
    scales: Vec<f64>,
}

impl ScaleFactors {
    /// Fit scale factors on the training split.
    ///
    /// Only the values of `train` are read. An all-zero series gets the
    /// unit scale and a warning.
    pub fn fit(train: &Dataset) -> Result<Self> {
        let mut scales = Vec::with_capacity(train.num_series());
        let mut degenerate = 0usize;

        for series in train.series() {
            let outcome = max_abs_scale(series.values())?;
            if outcome.is_degenerate() {
                degenerate += 1;
                warn!(
                    series_id = series.id(),
                    "Training series is all zeros, using unit scale"
                );
            }
            scales.push(outcome.value());
        }

        info!(
            series = scales.len(),
            train_len = train.len(),
            degenerate,
            "Fitted scale factors"
        );
        Ok(Self { scales })
    }

    /// Use previously persisted scales
    pub fn from_scales(scales: Vec<f64>) -> Result<Self> {
        if scales.is_empty() {
            return Err(ForecastError::DataError(
                "Scale factors must cover at least one series".to_string(),
            ));
        }
        if let Some((id, bad)) = scales
            .iter()
            .enumerate()
            .find(|(_, s)| !(s.is_finite() && **s > 0.0))
        {
            return Err(ForecastError::DataError(format!(
                "Scale for series {} must be positive and finite, got {}",
                id, bad
            )));
        }
        Ok(Self { scales })
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Scale of one series
    pub fn scale(&self, series_id: usize) -> Result<f64> {
        self.scales.get(series_id).copied().ok_or_else(|| {
            ForecastError::ShapeMismatch(format!(
                "No scale factor for series {} ({} fitted)",
                series_id,
                self.scales.len()
            ))
        })
    }

    /// Divide one series by its scale
    pub fn transform(&self, series_id: usize, values: &[f64]) -> Result<Vec<f64>> {
        Ok(scale_values(values, self.scale(series_id)?)?)
    }

    /// Multiply one series by its scale
    pub fn inverse_transform(&self, series_id: usize, values: &[f64]) -> Result<Vec<f64>> {
        Ok(unscale_values(values, self.scale(series_id)?)?)
    }

    /// Normalize every series of a dataset
    pub fn transform_dataset(&self, dataset: &Dataset) -> Result<Dataset> {
        self.check_series_count(dataset.num_series())?;
        dataset.map_values(|id, values| self.transform(id, values))
    }

    /// Restore every series of a normalized dataset to the original scale
    pub fn inverse_transform_dataset(&self, dataset: &Dataset) -> Result<Dataset> {
        self.check_series_count(dataset.num_series())?;
        dataset.map_values(|id, values| self.inverse_transform(id, values))
    }

    /// Restore sampled paths laid out as `samples[sample][series][step]`
    pub fn inverse_transform_samples(&self, samples: &[Vec<Vec<f64>>]) -> Result<Vec<Vec<Vec<f64>>>> {
        samples
            .iter()
            .map(|sample| {
                self.check_series_count(sample.len())?;
                sample
                    .iter()
                    .enumerate()
                    .map(|(id, path)| self.inverse_transform(id, path))
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }

    /// Persist as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load scales written by [`ScaleFactors::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw: ScaleFactors = serde_json::from_str(&fs::read_to_string(path)?)?;
        Self::from_scales(raw.scales)
    }

    fn check_series_count(&self, count: usize) -> Result<()> {
        if count != self.scales.len() {
            return Err(ForecastError::ShapeMismatch(format!(
                "{} series given but {} scale factors fitted",
                count,
                self.scales.len()
            )));
        }
        Ok(())
    }
}
