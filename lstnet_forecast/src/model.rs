//! Forecasting models behind the request/response contract
//!
//! The trained network is opaque: anything that turns a [`ForecastRequest`]
//! into sampled paths can stand in for it.

use crate::codec::{decode_response, encode_request_json};
use crate::config::EndpointConfig;
use crate::data::Frequency;
use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastRequest, ForecastResponse, SamplePaths};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use statrs::statistics::Statistics;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, info};

/// Common interface for forecasting models
pub trait ForecastModel: Debug {
    /// Produce sampled forecast paths for the request
    fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// A trained model served over HTTP.
///
/// Each call is a single blocking POST bounded by the configured timeout.
/// Failures are returned as they happen; retrying is left to the caller.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    name: String,
    url: String,
    timeout: Duration,
    client: Client,
}

impl HttpEndpoint {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        config.validate()?;
        let timeout = config.timeout()?;
        let mut builder = Client::builder().timeout(timeout);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| ForecastError::InvalidParameter(format!("HTTP client: {}", e)))?;

        Ok(Self {
            name: format!("HTTP endpoint ({})", config.url),
            url: config.url.clone(),
            timeout,
            client,
        })
    }

    fn failure(&self, request: &ForecastRequest, reason: String) -> ForecastError {
        ForecastError::RemoteCallFailure {
            context: Box::new(request.context().clone()),
            reason,
        }
    }
}

impl ForecastModel for HttpEndpoint {
    fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        let body = encode_request_json(request)?;
        debug!(url = %self.url, bytes = body.len(), "Invoking model endpoint");

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("timed out after {:?}", self.timeout)
                } else {
                    e.to_string()
                };
                self.failure(request, reason)
            })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| self.failure(request, format!("reading body: {}", e)))?;
        if !status.is_success() {
            return Err(self.failure(request, format!("endpoint returned {}: {}", status, text)));
        }

        decode_response(&text)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Reference model drawing random-walk paths from the last observed value.
///
/// The step noise is Gaussian with the standard deviation of the one-step
/// differences in the history. Paths depend only on the request and the seed.
#[derive(Debug, Clone)]
pub struct NaiveSampler {
    name: String,
    prediction_length: usize,
    num_samples: usize,
    freq: Frequency,
    seed: u64,
}

impl NaiveSampler {
    pub fn new(prediction_length: usize, num_samples: usize, freq: Frequency, seed: u64) -> Result<Self> {
        if prediction_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "prediction_length must be at least 1".to_string(),
            ));
        }
        if num_samples == 0 {
            return Err(ForecastError::InvalidParameter(
                "num_samples must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            name: format!("Naive sampler (samples={})", num_samples),
            prediction_length,
            num_samples,
            freq,
            seed,
        })
    }
}

impl ForecastModel for NaiveSampler {
    fn forecast(&self, request: &ForecastRequest) -> Result<ForecastResponse> {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let noise = request
            .target()
            .iter()
            .map(|history| {
                let sigma = if history.len() > 2 {
                    history.windows(2).map(|w| w[1] - w[0]).std_dev()
                } else {
                    0.0
                };
                Normal::new(0.0, sigma).map_err(|e| {
                    ForecastError::DataError(format!("Cannot sample with sigma {}: {}", sigma, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut samples = Vec::with_capacity(self.num_samples);
        for _ in 0..self.num_samples {
            let mut sample = Vec::with_capacity(request.num_series());
            for (history, dist) in request.target().iter().zip(noise.iter()) {
                let mut level = history.last().copied().unwrap_or(0.0);
                let path = (0..self.prediction_length)
                    .map(|_| {
                        level += dist.sample(&mut rng);
                        level
                    })
                    .collect();
                sample.push(path);
            }
            samples.push(sample);
        }

        let start = self.freq.step(request.start(), request.history_length())?;
        info!(
            model = %self.name,
            series = request.num_series(),
            horizon = self.prediction_length,
            "Sampled naive forecast"
        );
        Ok(ForecastResponse::new(SamplePaths::new(samples)?, start, self.freq))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
