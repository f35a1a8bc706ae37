//! # LSTNet Forecast
//!
//! Data preparation, model protocol and evaluation around a multivariate
//! LSTNet forecasting model that is trained and served elsewhere.
//!
//! ## Features
//!
//! - Per-series max-absolute normalization fitted on the training split only
//! - Fixed-length context/prediction windows over a shared timestamp grid
//! - JSON codec for the model endpoint, including string-embedded metrics
//! - RMSE, MASE, sMAPE and quantile metrics on sampled forecasts
//! - Long-form train/test/forecast tables for plotting
//!
//! ## Data flow
//!
//! raw series → [`normalize`] → [`window`] → [`codec`] / [`model`] →
//! [`metrics`] → [`viz`]
//!
//! ## Quick Start
//!
//! ```rust
//! use lstnet_forecast::config::PipelineConfig;
//! use lstnet_forecast::data::{parse_timestamp, Dataset, Frequency};
//! use lstnet_forecast::model::NaiveSampler;
//! use lstnet_forecast::pipeline::ForecastPipeline;
//!
//! let start = parse_timestamp("2014-01-01 00:00:00")?;
//! let values = (0..3)
//!     .map(|s| (0..48).map(|t| 10.0 + s as f64 + (t % 24) as f64).collect())
//!     .collect();
//! let dataset = Dataset::new(start, Frequency::hourly(), values)?;
//!
//! let mut config = PipelineConfig::default();
//! config.hyperparameters.context_length = 24;
//! config.hyperparameters.prediction_length = 6;
//!
//! // Stand-in for the served model
//! let model = NaiveSampler::new(6, 50, dataset.freq(), 7)?;
//! let outcome = ForecastPipeline::new(config, model)?.run(&dataset)?;
//!
//! assert_eq!(outcome.response.samples.prediction_length(), 6);
//! assert!(outcome.evaluation.rmse() >= 0.0);
//! # Ok::<(), lstnet_forecast::ForecastError>(())
//! ```

pub mod artifacts;
pub mod codec;
pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod viz;
pub mod window;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{DataLoader, Dataset, Frequency};
pub use crate::error::{ForecastError, RequestContext};
pub use crate::forecast::{ForecastRequest, ForecastResponse, SamplePaths};
pub use crate::metrics::{Evaluation, MetricEngine};
pub use crate::model::ForecastModel;
pub use crate::normalize::ScaleFactors;
pub use crate::pipeline::{ForecastPipeline, PipelineOutcome};
pub use crate::window::WindowSpec;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
