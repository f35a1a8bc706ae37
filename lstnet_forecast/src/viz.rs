//! Long-form table of train, test and forecast values for display

use crate::data::{format_timestamp, Dataset};
use crate::error::{ForecastError, Result};
use crate::forecast::ForecastResponse;
use chrono::NaiveDateTime;
use polars::prelude::{DataFrame, NamedFrom, Series};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Serialize, Serializer};
use series_math::sampling::sample_mean;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Which part of the timeline a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
    Forecast,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Forecast => "forecast",
        };
        f.write_str(name)
    }
}

/// Which series to display
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesSelection {
    /// The first `n` series
    First(usize),
    /// Exactly these series ids
    Ids(Vec<usize>),
    /// `count` distinct ids drawn with a fixed seed
    Sample { count: usize, seed: u64 },
}

impl SeriesSelection {
    /// Resolve to sorted, distinct series ids among `num_series`
    pub fn resolve(&self, num_series: usize) -> Result<Vec<usize>> {
        let mut ids = match self {
            SeriesSelection::First(n) => (0..(*n).min(num_series)).collect::<Vec<_>>(),
            SeriesSelection::Ids(ids) => {
                if let Some(bad) = ids.iter().find(|id| **id >= num_series) {
                    return Err(ForecastError::InvalidParameter(format!(
                        "Series {} does not exist ({} series)",
                        bad, num_series
                    )));
                }
                ids.clone()
            }
            SeriesSelection::Sample { count, seed } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                sample(&mut rng, num_series, (*count).min(num_series)).into_vec()
            }
        };
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}

/// One `(timestamp, series, value, split)` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VizRow {
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: NaiveDateTime,
    pub series: String,
    pub value: f64,
    pub split: Split,
}

fn serialize_timestamp<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}

/// Rows for the selected series, grouped by split then series then time
#[derive(Debug, Clone, PartialEq)]
pub struct VizTable {
    rows: Vec<VizRow>,
}

impl VizTable {
    /// Reshape denormalized train, test and forecast data into long form.
    ///
    /// Forecast rows carry the per-step mean of the sample paths. The
    /// datasets must hold the same series in the same order.
    pub fn assemble(
        train: &Dataset,
        test: &Dataset,
        forecast: &ForecastResponse,
        selection: &SeriesSelection,
    ) -> Result<Self> {
        if train.num_series() != test.num_series()
            || train.num_series() != forecast.samples.num_series()
        {
            return Err(ForecastError::ShapeMismatch(format!(
                "train has {} series, test {} and forecast {}",
                train.num_series(),
                test.num_series(),
                forecast.samples.num_series()
            )));
        }
        if train.freq() != test.freq() || train.freq() != forecast.freq {
            return Err(ForecastError::ShapeMismatch(
                "train, test and forecast are on different frequencies".to_string(),
            ));
        }

        let ids = selection.resolve(train.num_series())?;
        let mut rows = Vec::new();

        for (split, dataset) in [(Split::Train, train), (Split::Test, test)] {
            let stamps = dataset.timestamps()?;
            for &id in &ids {
                let series = &dataset.series()[id];
                rows.extend(stamps.iter().zip(series.values()).map(|(ts, value)| VizRow {
                    timestamp: *ts,
                    series: series.label().to_string(),
                    value: *value,
                    split,
                }));
            }
        }

        let stamps = forecast.timestamps()?;
        for &id in &ids {
            let mean = sample_mean(&forecast.samples.series_paths(id)?)?;
            let label = train.series()[id].label();
            rows.extend(stamps.iter().zip(mean).map(|(ts, value)| VizRow {
                timestamp: *ts,
                series: label.to_string(),
                value,
                split: Split::Forecast,
            }));
        }

        info!(series = ids.len(), rows = rows.len(), "Assembled visualization table");
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[VizRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns `timestamp`, `series`, `value`, `split`
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let timestamps: Vec<String> = self.rows.iter().map(|r| format_timestamp(&r.timestamp)).collect();
        let series: Vec<&str> = self.rows.iter().map(|r| r.series.as_str()).collect();
        let values: Vec<f64> = self.rows.iter().map(|r| r.value).collect();
        let splits: Vec<String> = self.rows.iter().map(|r| r.split.to_string()).collect();

        let df = DataFrame::new(vec![
            Series::new("timestamp", timestamps),
            Series::new("series", series),
            Series::new("value", values),
            Series::new("split", splits),
        ])?;
        Ok(df)
    }

    /// Write the rows as CSV with a header line
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
