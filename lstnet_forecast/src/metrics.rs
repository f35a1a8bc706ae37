//! Accuracy of sampled forecasts against held-out ground truth
//!
//! Scores are always computed in the original scale of the data. When the
//! samples arrive normalized, the engine multiplies them back by the fitted
//! scale factors first.

use crate::error::{ForecastError, Result};
use crate::forecast::SamplePaths;
use crate::normalize::ScaleFactors;
use serde::{Deserialize, Serialize};
use series_math::accuracy::{
    abs_error_sum, coverage, mase, naive_mae, quantile_loss, squared_error_sum, symmetric_mape,
};
use series_math::sampling::{sample_mean, sample_quantile};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-series metrics, named on the wire the way the endpoint names them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMetrics {
    #[serde(rename = "item_id")]
    pub series_id: usize,
    #[serde(rename = "MSE")]
    pub mse: f64,
    pub abs_error: f64,
    /// `None` when the naive in-sample error of the training segment is zero
    #[serde(rename = "MASE")]
    pub mase: Option<f64>,
    #[serde(rename = "sMAPE")]
    pub smape: f64,
}

/// Aggregate and per-series scores of one forecast
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub aggregate: BTreeMap<String, f64>,
    pub items: Vec<ItemMetrics>,
}

impl Evaluation {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.aggregate.get(key).copied()
    }

    pub fn rmse(&self) -> f64 {
        self.aggregate.get("RMSE").copied().unwrap_or(f64::NAN)
    }
}

impl std::fmt::Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Evaluation ({} series):", self.items.len())?;
        for (key, value) in &self.aggregate {
            writeln!(f, "  {:<20} {:.6}", key, value)?;
        }
        Ok(())
    }
}

fn default_seasonal_lag() -> usize {
    1
}

fn default_quantiles() -> Vec<f64> {
    vec![0.1, 0.5, 0.9]
}

/// Knobs of the metric engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Lag of the naive forecast in the MASE denominator
    #[serde(default = "default_seasonal_lag")]
    pub seasonal_lag: usize,
    /// Quantiles scored from the empirical sample distribution
    #[serde(default = "default_quantiles")]
    pub quantiles: Vec<f64>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            seasonal_lag: default_seasonal_lag(),
            quantiles: default_quantiles(),
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.seasonal_lag == 0 {
            return Err(ForecastError::InvalidParameter(
                "seasonal_lag must be at least 1".to_string(),
            ));
        }
        if let Some(q) = self.quantiles.iter().find(|q| !(**q > 0.0 && **q < 1.0)) {
            return Err(ForecastError::InvalidParameter(format!(
                "Quantile {} is outside (0, 1)",
                q
            )));
        }
        Ok(())
    }
}

/// Scale the samples arrive in
#[derive(Debug, Clone, Copy)]
pub enum SampleScale<'a> {
    /// Already in the original scale of the data
    Original,
    /// Normalized with these factors
    Normalized(&'a ScaleFactors),
}

/// Computes RMSE, MASE, sMAPE and the quantile metrics
#[derive(Debug, Clone)]
pub struct MetricEngine {
    config: EvaluationConfig,
}

impl MetricEngine {
    pub fn new(config: EvaluationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Score `samples` against `truth`.
    ///
    /// `truth[id]` is the ground truth of the forecast horizon and `train[id]`
    /// the training segment of series `id`, both in the original scale.
    pub fn evaluate<T, U>(
        &self,
        samples: &SamplePaths,
        scale: SampleScale<'_>,
        truth: &[T],
        train: &[U],
    ) -> Result<Evaluation>
    where
        T: AsRef<[f64]>,
        U: AsRef<[f64]>,
    {
        let restored;
        let samples = match scale {
            SampleScale::Original => samples,
            SampleScale::Normalized(scales) => {
                restored = samples.denormalize(scales)?;
                &restored
            }
        };
        self.check_shapes(samples, truth, train)?;

        let num_series = samples.num_series();
        let horizon = samples.prediction_length();
        let points = (num_series * horizon) as f64;

        let mut items = Vec::with_capacity(num_series);
        let mut total_se = 0.0;
        let mut total_ae = 0.0;
        let mut abs_target_sum = 0.0;
        let mut quantile_losses = vec![0.0; self.config.quantiles.len()];
        let mut coverages = vec![0.0; self.config.quantiles.len()];

        for id in 0..num_series {
            let paths = samples.series_paths(id)?;
            let actual = truth[id].as_ref();
            let mean = sample_mean(&paths)?;

            let se = squared_error_sum(actual, &mean)?;
            let ae = abs_error_sum(actual, &mean)?;
            let naive = naive_mae(train[id].as_ref(), self.config.seasonal_lag)?;

            total_se += se;
            total_ae += ae;
            abs_target_sum += actual.iter().map(|v| v.abs()).sum::<f64>();

            for (k, q) in self.config.quantiles.iter().enumerate() {
                let quantile = sample_quantile(&paths, *q)?;
                quantile_losses[k] += quantile_loss(actual, &quantile, *q)?;
                coverages[k] += coverage(actual, &quantile)? * horizon as f64;
            }

            items.push(ItemMetrics {
                series_id: id,
                mse: se / horizon as f64,
                abs_error: ae,
                mase: mase(actual, &mean, naive)?,
                smape: symmetric_mape(actual, &mean)?,
            });
        }

        let mut aggregate = BTreeMap::new();
        let mse = total_se / points;
        aggregate.insert("MSE".to_string(), mse);
        aggregate.insert("RMSE".to_string(), mse.sqrt());
        aggregate.insert("abs_error".to_string(), total_ae);
        aggregate.insert("abs_target_sum".to_string(), abs_target_sum);
        aggregate.insert(
            "sMAPE".to_string(),
            items.iter().map(|item| item.smape).mean(),
        );

        if abs_target_sum > 0.0 {
            aggregate.insert("ND".to_string(), total_ae / abs_target_sum);
            aggregate.insert(
                "NRMSE".to_string(),
                mse.sqrt() / (abs_target_sum / points),
            );
        }

        let defined: Vec<f64> = items.iter().filter_map(|item| item.mase).collect();
        let undefined = items.len() - defined.len();
        if !defined.is_empty() {
            aggregate.insert("MASE".to_string(), defined.iter().mean());
        }
        aggregate.insert("MASE_undefined".to_string(), undefined as f64);

        for (k, q) in self.config.quantiles.iter().enumerate() {
            aggregate.insert(format!("QuantileLoss[{}]", q), quantile_losses[k]);
            aggregate.insert(format!("Coverage[{}]", q), coverages[k] / points);
            if abs_target_sum > 0.0 {
                aggregate.insert(
                    format!("wQuantileLoss[{}]", q),
                    quantile_losses[k] / abs_target_sum,
                );
            }
        }

        debug!(
            series = num_series,
            horizon,
            rmse = mse.sqrt(),
            mase_undefined = undefined,
            "Scored forecast"
        );
        Ok(Evaluation { aggregate, items })
    }

    fn check_shapes<T, U>(&self, samples: &SamplePaths, truth: &[T], train: &[U]) -> Result<()>
    where
        T: AsRef<[f64]>,
        U: AsRef<[f64]>,
    {
        if truth.len() != samples.num_series() || train.len() != samples.num_series() {
            return Err(ForecastError::ShapeMismatch(format!(
                "Forecast covers {} series but truth has {} and training data {}",
                samples.num_series(),
                truth.len(),
                train.len()
            )));
        }
        if let Some((id, row)) = truth
            .iter()
            .enumerate()
            .find(|(_, row)| row.as_ref().len() != samples.prediction_length())
        {
            return Err(ForecastError::ShapeMismatch(format!(
                "Ground truth of series {} has {} steps, forecast has {}",
                id,
                row.as_ref().len(),
                samples.prediction_length()
            )));
        }
        Ok(())
    }
}

impl Default for MetricEngine {
    fn default() -> Self {
        Self {
            config: EvaluationConfig::default(),
        }
    }
}
