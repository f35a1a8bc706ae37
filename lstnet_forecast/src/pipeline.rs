//! End-to-end run: split, normalize, window, forecast, score, visualize

use crate::artifacts::Artifacts;
use crate::config::PipelineConfig;
use crate::data::{Dataset, TrainTestSplit};
use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastRequest, ForecastResponse};
use crate::metrics::{Evaluation, MetricEngine, SampleScale};
use crate::model::ForecastModel;
use crate::normalize::ScaleFactors;
use crate::viz::{SeriesSelection, VizTable};
use crate::window::{WindowPlan, WindowSpec};
use tracing::{debug, info, warn};

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Original-scale splits
    pub split: TrainTestSplit,
    pub scales: ScaleFactors,
    /// Windows over the normalized test split
    pub plan: WindowPlan,
    /// Request sent to the model, in normalized scale
    pub request: ForecastRequest,
    /// Model response, denormalized
    pub response: ForecastResponse,
    pub evaluation: Evaluation,
    pub viz: VizTable,
}

/// Runs a model over the held-out tail of a dataset
#[derive(Debug)]
pub struct ForecastPipeline<M: ForecastModel> {
    config: PipelineConfig,
    spec: WindowSpec,
    engine: MetricEngine,
    model: M,
}

impl<M: ForecastModel> ForecastPipeline<M> {
    pub fn new(config: PipelineConfig, model: M) -> Result<Self> {
        config.validate()?;
        let spec = config.window_spec()?;
        let engine = MetricEngine::new(config.evaluation.clone())?;
        Ok(Self {
            config,
            spec,
            engine,
            model,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Split the dataset and normalize both splits with scales fitted on
    /// the train split alone
    pub fn preprocess(&self, dataset: &Dataset) -> Result<Artifacts> {
        self.check_dataset(dataset)?;
        let split = dataset.train_test_split(self.spec.prediction_length())?;
        normalize(&split)
    }

    fn check_dataset(&self, dataset: &Dataset) -> Result<()> {
        if let Some(kind) = self.config.dataset {
            kind.check_series_count(dataset.num_series())?;
            if dataset.freq() != kind.freq() {
                warn!(
                    expected = %kind.freq(),
                    found = %dataset.freq(),
                    "Dataset frequency differs from the configured dataset"
                );
            }
        }
        Ok(())
    }

    pub fn run(&self, dataset: &Dataset) -> Result<PipelineOutcome> {
        info!(
            model = self.model.name(),
            series = dataset.num_series(),
            len = dataset.len(),
            "Starting forecast pipeline"
        );

        self.check_dataset(dataset)?;
        let split = dataset.train_test_split(self.spec.prediction_length())?;
        let prepared = normalize(&split)?;
        let scales = prepared.scales;

        let plan = self.spec.plan(&prepared.test)?;
        debug!(
            training_windows = plan.training.len(),
            forecast_start = %plan.evaluation.target_start,
            "Planned windows"
        );

        let request = ForecastRequest::from_window(&prepared.test, &plan.evaluation)?;
        request.validate_for(&self.spec)?;

        let response = self
            .model
            .forecast(&request)
            .map_err(|e| attribute_failure(e, &request))?;
        self.check_response(&request, &response)?;
        if !response.agg_metrics.is_empty() {
            debug!(metrics = ?response.agg_metrics, "Endpoint reported metrics");
        }
        let response = response.denormalized(&scales)?;

        let test_values = split.test.values();
        let truth: Vec<&[f64]> = test_values
            .iter()
            .map(|values| plan.evaluation.target(values))
            .collect();
        let evaluation = self.engine.evaluate(
            &response.samples,
            SampleScale::Original,
            &truth,
            &split.train.values(),
        )?;
        info!(
            rmse = evaluation.rmse(),
            mase = ?evaluation.get("MASE"),
            smape = ?evaluation.get("sMAPE"),
            "Evaluated forecast"
        );

        let held_out = split.test.slice(plan.evaluation.bounds.target.clone())?;
        let selection = SeriesSelection::Sample {
            count: self.config.visualization.series_shown,
            seed: self.config.visualization.seed,
        };
        let viz = VizTable::assemble(&split.train, &held_out, &response, &selection)?;

        Ok(PipelineOutcome {
            split,
            scales,
            plan,
            request,
            response,
            evaluation,
            viz,
        })
    }

    fn check_response(&self, request: &ForecastRequest, response: &ForecastResponse) -> Result<()> {
        let samples = &response.samples;
        if samples.num_series() != request.num_series()
            || samples.prediction_length() != self.spec.prediction_length()
        {
            return Err(ForecastError::ShapeMismatch(format!(
                "Requested {} series over {} steps, model returned {} over {}",
                request.num_series(),
                self.spec.prediction_length(),
                samples.num_series(),
                samples.prediction_length()
            )));
        }
        if response.start != request.context().forecast_start {
            warn!(
                expected = %request.context().forecast_start,
                returned = %response.start,
                "Forecast start differs from the evaluation window"
            );
        }
        Ok(())
    }
}

fn normalize(split: &TrainTestSplit) -> Result<Artifacts> {
    let scales = ScaleFactors::fit(&split.train)?;
    Ok(Artifacts {
        train: scales.transform_dataset(&split.train)?,
        test: scales.transform_dataset(&split.test)?,
        scales,
    })
}

/// Attach the request context to model failures that lack one.
///
/// Wire-level errors keep their kind.
fn attribute_failure(err: ForecastError, request: &ForecastRequest) -> ForecastError {
    match err {
        e @ (ForecastError::RemoteCallFailure { .. }
        | ForecastError::ProtocolError(_)
        | ForecastError::ShapeMismatch(_)) => e,
        other => ForecastError::RemoteCallFailure {
            context: Box::new(request.context().clone()),
            reason: other.to_string(),
        },
    }
}
