//! Pipeline configuration, loaded from a JSON file with every field defaulted

use crate::data::Frequency;
use crate::error::{ForecastError, Result};
use crate::metrics::EvaluationConfig;
use crate::window::WindowSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration of one forecasting run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Expected dataset shape; unchecked when absent
    #[serde(default)]
    pub dataset: Option<DatasetKind>,
    #[serde(default)]
    pub hyperparameters: HyperParameters,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub visualization: VisualizationConfig,
}

impl PipelineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.window_spec()?;
        self.endpoint.validate()?;
        self.evaluation.validate()
    }

    /// Context and prediction lengths the model was trained with
    pub fn window_spec(&self) -> Result<WindowSpec> {
        WindowSpec::new(
            self.hyperparameters.context_length,
            self.hyperparameters.prediction_length,
        )
    }
}

/// Supported datasets, each with a fixed shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Hourly load of 321 clients
    Electricity,
    /// Daily rates of 8 currencies
    ExchangeRate,
}

impl DatasetKind {
    pub fn num_series(&self) -> usize {
        match self {
            DatasetKind::Electricity => 321,
            DatasetKind::ExchangeRate => 8,
        }
    }

    pub fn freq(&self) -> Frequency {
        match self {
            DatasetKind::Electricity => Frequency::hourly(),
            DatasetKind::ExchangeRate => Frequency::daily(),
        }
    }

    /// Fail unless a loaded dataset has the expected series count
    pub fn check_series_count(&self, num_series: usize) -> Result<()> {
        if num_series != self.num_series() {
            return Err(ForecastError::DataError(format!(
                "{:?} has {} series, loaded data has {}",
                self,
                self.num_series(),
                num_series
            )));
        }
        Ok(())
    }
}

fn default_context_length() -> usize {
    168
}
fn default_prediction_length() -> usize {
    24
}
fn default_skip_size() -> usize {
    24
}
fn default_ar_window() -> usize {
    24
}
fn default_channels() -> usize {
    72
}
fn default_scaling() -> bool {
    false
}
fn default_output_activation() -> String {
    "sigmoid".to_string()
}
fn default_epochs() -> usize {
    100
}
fn default_batch_size() -> usize {
    128
}
fn default_learning_rate() -> f64 {
    0.01
}

/// Training hyperparameters of the model.
///
/// Only the two lengths shape requests here; the rest are handed to the
/// training job unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParameters {
    #[serde(default = "default_context_length")]
    pub context_length: usize,
    #[serde(default = "default_prediction_length")]
    pub prediction_length: usize,
    #[serde(default = "default_skip_size")]
    pub skip_size: usize,
    #[serde(default = "default_ar_window")]
    pub ar_window: usize,
    #[serde(default = "default_channels")]
    pub channels: usize,
    #[serde(default = "default_scaling")]
    pub scaling: bool,
    #[serde(default = "default_output_activation")]
    pub output_activation: String,
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
}

impl Default for HyperParameters {
    fn default() -> Self {
        Self {
            context_length: default_context_length(),
            prediction_length: default_prediction_length(),
            skip_size: default_skip_size(),
            ar_window: default_ar_window(),
            channels: default_channels(),
            scaling: default_scaling(),
            output_activation: default_output_activation(),
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
        }
    }
}

impl HyperParameters {
    /// String map as training jobs take hyperparameters
    pub fn to_wire_map(&self) -> BTreeMap<String, String> {
        [
            ("context_length", self.context_length.to_string()),
            ("prediction_length", self.prediction_length.to_string()),
            ("skip_size", self.skip_size.to_string()),
            ("ar_window", self.ar_window.to_string()),
            ("channels", self.channels.to_string()),
            ("scaling", self.scaling.to_string()),
            ("output_activation", self.output_activation.clone()),
            ("epochs", self.epochs.to_string()),
            ("batch_size", self.batch_size.to_string()),
            ("learning_rate", self.learning_rate.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

fn default_url() -> String {
    "http://localhost:8080/invocations".to_string()
}
fn default_timeout_secs() -> f64 {
    60.0
}
fn default_use_system_proxy() -> bool {
    true
}

/// Where the trained model is served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Upper bound on one request, after which the call fails
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    /// Honor `HTTP_PROXY` and friends from the environment
    #[serde(default = "default_use_system_proxy")]
    pub use_system_proxy: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
            use_system_proxy: default_use_system_proxy(),
        }
    }
}

impl EndpointConfig {
    /// The request timeout as a `Duration`
    pub fn timeout(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.timeout_secs).map_err(|e| {
            ForecastError::InvalidParameter(format!(
                "timeout_secs {} is not a valid duration: {}",
                self.timeout_secs, e
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.timeout_secs.is_finite() && self.timeout_secs > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "timeout_secs must be positive, got {}",
                self.timeout_secs
            )));
        }
        self.timeout()?;
        if self.url.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "endpoint url is empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_series_shown() -> usize {
    5
}
fn default_seed() -> u64 {
    1
}

/// How many series to put in the visualization table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationConfig {
    #[serde(default = "default_series_shown")]
    pub series_shown: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            series_shown: default_series_shown(),
            seed: default_seed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.hyperparameters.context_length, 168);
        assert_eq!(config.evaluation.seasonal_lag, 1);
        assert!(config.validate().is_ok());
        assert!(config.dataset.is_none());
    }

    #[test]
    fn test_partial_document() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"dataset": "exchange_rate",
                "hyperparameters": {"context_length": 12, "prediction_length": 6},
                "endpoint": {"timeout_secs": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.dataset, Some(DatasetKind::ExchangeRate));
        assert_eq!(config.window_spec().unwrap().span(), 18);
        assert_eq!(config.hyperparameters.skip_size, 24);
        assert_eq!(config.endpoint.timeout_secs, 5.0);
        assert!(config.endpoint.use_system_proxy);

        let wire = config.hyperparameters.to_wire_map();
        assert_eq!(wire["context_length"], "12");
        assert_eq!(wire["output_activation"], "sigmoid");
        assert_eq!(wire.len(), 10);
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"endpoint": {"timeout_secs": 0}}"#).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_oversized_timeout_rejected() {
        let endpoint = EndpointConfig {
            timeout_secs: 1e30,
            ..EndpointConfig::default()
        };
        assert!(matches!(
            endpoint.validate(),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert_eq!(
            EndpointConfig::default().timeout().unwrap(),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_dataset_kind_shapes() {
        let kind: DatasetKind = serde_json::from_str("\"exchange_rate\"").unwrap();
        assert_eq!(kind.num_series(), 8);
        assert_eq!(kind.freq(), Frequency::daily());
        assert!(kind.check_series_count(7).is_err());
        assert!(DatasetKind::Electricity.check_series_count(321).is_ok());
    }
}
