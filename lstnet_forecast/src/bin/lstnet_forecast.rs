//! Run the forecast pipeline over a raw CSV file.
//!
//! ```text
//! lstnet-forecast <config.json> <data.csv> [--local] [--out viz.csv] [--artifacts DIR]
//! ```
//!
//! `--local` swaps the HTTP endpoint for the naive sampler. Set `RUST_LOG`
//! to change verbosity.

use clap::Parser;
use lstnet_forecast::artifacts::write_artifacts;
use lstnet_forecast::config::PipelineConfig;
use lstnet_forecast::model::{ForecastModel, HttpEndpoint, NaiveSampler};
use lstnet_forecast::pipeline::ForecastPipeline;
use lstnet_forecast::{DataLoader, Dataset, ForecastError};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const LOCAL_SAMPLES: usize = 100;

#[derive(Parser, Debug)]
#[command(name = "lstnet-forecast")]
#[command(about = "Forecast the held-out tail of a dataset and score it", long_about = None)]
struct Args {
    /// Pipeline configuration (JSON)
    config: PathBuf,

    /// Wide CSV: timestamp column followed by one column per series
    data: PathBuf,

    /// Use the naive sampler instead of the HTTP endpoint
    #[arg(long)]
    local: bool,

    /// Where to write the visualization table
    #[arg(short, long, default_value = "forecast_viz.csv")]
    out: PathBuf,

    /// Also write normalized train/test splits and scales here
    #[arg(long)]
    artifacts: Option<PathBuf>,
}

fn run_with<M: ForecastModel>(
    config: PipelineConfig,
    model: M,
    dataset: &Dataset,
    args: &Args,
) -> Result<(), ForecastError> {
    let pipeline = ForecastPipeline::new(config, model)?;

    if let Some(dir) = &args.artifacts {
        let prepared = pipeline.preprocess(dataset)?;
        write_artifacts(dir, &prepared.train, &prepared.test, &prepared.scales)?;
    }

    let outcome = pipeline.run(dataset)?;
    for (key, value) in &outcome.evaluation.aggregate {
        info!(metric = %key, value, "Aggregate metric");
    }
    println!("{}", outcome.evaluation);

    outcome.viz.write_csv(&args.out)?;
    info!(path = %args.out.display(), rows = outcome.viz.len(), "Wrote visualization table");
    Ok(())
}

fn run(args: Args) -> Result<(), ForecastError> {
    let config = PipelineConfig::from_json_file(&args.config)?;
    // Inferred from the file so the pipeline can compare it with the configured dataset
    let dataset = DataLoader::from_csv(&args.data, None)?;
    info!(
        path = %args.data.display(),
        series = dataset.num_series(),
        len = dataset.len(),
        freq = %dataset.freq(),
        "Loaded dataset"
    );
    info!(hyperparameters = ?config.hyperparameters.to_wire_map(), "Model hyperparameters");

    if args.local {
        let model = NaiveSampler::new(
            config.hyperparameters.prediction_length,
            LOCAL_SAMPLES,
            dataset.freq(),
            config.visualization.seed,
        )?;
        run_with(config, model, &dataset, &args)
    } else {
        let model = HttpEndpoint::new(&config.endpoint)?;
        run_with(config, model, &dataset, &args)
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lstnet_forecast=info".into()),
        )
        .init();

    let result = run(Args::parse());
    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
