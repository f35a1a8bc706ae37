//! Files written by the preprocessing job
//!
//! A directory holds `train.json` and `test.json` as JSON lines, one object
//! per series, next to `scales.json` with the fitted scale factors.

use crate::data::{format_timestamp, parse_timestamp, Dataset, Frequency, TrainTestSplit};
use crate::error::{ForecastError, Result};
use crate::normalize::ScaleFactors;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

pub const TRAIN_FILE: &str = "train.json";
pub const TEST_FILE: &str = "test.json";
pub const SCALES_FILE: &str = "scales.json";

/// One line of a channel file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SeriesRecord {
    start: String,
    target: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feat_dynamic_real: Option<Vec<Vec<f64>>>,
}

/// Normalized splits and the scales that produced them
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub train: Dataset,
    pub test: Dataset,
    pub scales: ScaleFactors,
}

impl Artifacts {
    pub fn prediction_length(&self) -> usize {
        self.test.len().saturating_sub(self.train.len())
    }

    /// View the stored splits as a train/test split
    pub fn split(&self) -> TrainTestSplit {
        TrainTestSplit {
            train: self.train.clone(),
            test: self.test.clone(),
            prediction_length: self.prediction_length(),
        }
    }
}

/// Write both splits and the scales into `dir`, creating it if needed
pub fn write_artifacts<P: AsRef<Path>>(
    dir: P,
    train: &Dataset,
    test: &Dataset,
    scales: &ScaleFactors,
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    write_channel(&dir.join(TRAIN_FILE), train)?;
    write_channel(&dir.join(TEST_FILE), test)?;
    scales.save(dir.join(SCALES_FILE))?;
    info!(
        dir = %dir.display(),
        series = train.num_series(),
        train_len = train.len(),
        test_len = test.len(),
        "Wrote preprocessing artifacts"
    );
    Ok(())
}

/// Read a directory written by [`write_artifacts`].
///
/// Every line must share one start timestamp and one length, and the test
/// split must extend the train split.
pub fn read_artifacts<P: AsRef<Path>>(dir: P, freq: Frequency) -> Result<Artifacts> {
    let dir = dir.as_ref();
    let train = read_channel(&dir.join(TRAIN_FILE), freq)?;
    let test = read_channel(&dir.join(TEST_FILE), freq)?;
    let scales = ScaleFactors::load(dir.join(SCALES_FILE))?;

    if train.num_series() != test.num_series() || train.num_series() != scales.len() {
        return Err(ForecastError::DataError(format!(
            "train has {} series, test {} and scales {}",
            train.num_series(),
            test.num_series(),
            scales.len()
        )));
    }
    if test.len() < train.len() || test.start() != train.start() {
        return Err(ForecastError::DataError(
            "test split does not extend the train split".to_string(),
        ));
    }

    Ok(Artifacts {
        train,
        test,
        scales,
    })
}

fn write_channel(path: &Path, dataset: &Dataset) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let start = format_timestamp(&dataset.start());

    for series in dataset.series() {
        let record = SeriesRecord {
            start: start.clone(),
            target: series.values().to_vec(),
            item_id: Some(series.label().to_string()),
            feat_dynamic_real: dataset
                .covariates()
                .map(|rows| vec![rows[series.id()].clone()]),
        };
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn read_channel(path: &Path, freq: Frequency) -> Result<Dataset> {
    let reader = BufReader::new(File::open(path)?);
    let mut start = None;
    let mut values = Vec::new();
    let mut labels = Vec::new();
    let mut covariates = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: SeriesRecord = serde_json::from_str(&line).map_err(|e| {
            ForecastError::DataError(format!("{} line {}: {}", path.display(), n + 1, e))
        })?;

        let record_start = parse_timestamp(&record.start)?;
        match start {
            None => start = Some(record_start),
            Some(first) if first != record_start => {
                return Err(ForecastError::DataError(format!(
                    "{} line {} starts at {}, expected {}",
                    path.display(),
                    n + 1,
                    record.start,
                    format_timestamp(&first)
                )));
            }
            Some(_) => {}
        }

        match record.feat_dynamic_real {
            Some(mut rows) if rows.len() == 1 => covariates.push(rows.remove(0)),
            Some(rows) => {
                return Err(ForecastError::DataError(format!(
                    "{} line {} has {} covariate rows, expected 1",
                    path.display(),
                    n + 1,
                    rows.len()
                )));
            }
            None => {}
        }
        labels.push(
            record
                .item_id
                .unwrap_or_else(|| format!("series_{}", values.len())),
        );
        values.push(record.target);
    }

    let start = start.ok_or_else(|| {
        ForecastError::DataError(format!("{} has no series", path.display()))
    })?;
    if !covariates.is_empty() && covariates.len() != values.len() {
        return Err(ForecastError::DataError(format!(
            "{}: only {} of {} lines carry covariates",
            path.display(),
            covariates.len(),
            values.len()
        )));
    }

    Dataset::with_labels(start, freq, values, labels)?.with_covariates(covariates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let result = read_artifacts(dir.path().join("absent"), Frequency::hourly());
        assert!(matches!(result, Err(ForecastError::IoError(_))));
    }

    #[test]
    fn test_mixed_start_lines_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(TRAIN_FILE);
        fs::write(
            &path,
            "{\"start\": \"2014-01-01 00:00:00\", \"target\": [1.0, 2.0]}\n\
             {\"start\": \"2014-01-02 00:00:00\", \"target\": [3.0, 4.0]}\n",
        )
        .unwrap();
        let result = read_channel(&path, Frequency::hourly());
        assert!(matches!(result, Err(ForecastError::DataError(_))));
    }
}
