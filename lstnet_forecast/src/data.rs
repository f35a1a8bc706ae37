//! Multivariate series on a shared timestamp grid

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use polars::prelude::{CsvReader, DataFrame, DataType, SerReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Timestamp layout used on the wire and in artifacts
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a timestamp in any of the layouts the endpoint or raw files use
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for layout in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, layout) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight);
    }
    Err(ForecastError::DataError(format!(
        "Unrecognized timestamp '{}'",
        raw
    )))
}

/// Render a timestamp the way the endpoint expects it
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Base unit of a sampling frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencyUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

impl FrequencyUnit {
    fn code(&self) -> &'static str {
        match self {
            FrequencyUnit::Minute => "min",
            FrequencyUnit::Hour => "H",
            FrequencyUnit::Day => "D",
            FrequencyUnit::Week => "W",
            FrequencyUnit::Month => "M",
        }
    }
}

/// Regular sampling frequency, written as a pandas-style offset string
/// such as `"H"`, `"1H"`, `"15min"` or `"D"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    multiple: u32,
    unit: FrequencyUnit,
}

impl Frequency {
    pub fn new(multiple: u32, unit: FrequencyUnit) -> Result<Self> {
        if multiple == 0 {
            return Err(ForecastError::InvalidParameter(
                "Frequency multiple must be positive".to_string(),
            ));
        }
        Ok(Self { multiple, unit })
    }

    pub fn hourly() -> Self {
        Self {
            multiple: 1,
            unit: FrequencyUnit::Hour,
        }
    }

    pub fn daily() -> Self {
        Self {
            multiple: 1,
            unit: FrequencyUnit::Day,
        }
    }

    pub fn multiple(&self) -> u32 {
        self.multiple
    }

    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    /// Advance `ts` by `periods` steps of this frequency
    pub fn step(&self, ts: NaiveDateTime, periods: usize) -> Result<NaiveDateTime> {
        let overflow = || {
            ForecastError::DataError(format!(
                "Timestamp overflow stepping {} by {} x {}",
                ts, periods, self
            ))
        };
        let count = i64::try_from(periods)
            .ok()
            .and_then(|p| p.checked_mul(self.multiple as i64))
            .ok_or_else(overflow)?;

        let delta = match self.unit {
            FrequencyUnit::Minute => Duration::minutes(count),
            FrequencyUnit::Hour => Duration::hours(count),
            FrequencyUnit::Day => Duration::days(count),
            FrequencyUnit::Week => Duration::weeks(count),
            FrequencyUnit::Month => {
                let months = u32::try_from(count).map_err(|_| overflow())?;
                return ts.checked_add_months(Months::new(months)).ok_or_else(overflow);
            }
        };
        ts.checked_add_signed(delta).ok_or_else(overflow)
    }

    /// Infer the frequency from the gap between two consecutive timestamps
    pub fn infer(first: NaiveDateTime, second: NaiveDateTime) -> Result<Self> {
        let gap = second - first;
        let minutes = gap.num_minutes();
        if minutes <= 0 || gap.num_seconds() % 60 != 0 {
            return Err(ForecastError::DataError(format!(
                "Cannot infer frequency from {} -> {}",
                first, second
            )));
        }

        let (multiple, unit) = if is_one_month(first, second, gap) {
            (1, FrequencyUnit::Month)
        } else if minutes % (7 * 1440) == 0 {
            (minutes / (7 * 1440), FrequencyUnit::Week)
        } else if minutes % 1440 == 0 {
            (minutes / 1440, FrequencyUnit::Day)
        } else if minutes % 60 == 0 {
            (minutes / 60, FrequencyUnit::Hour)
        } else {
            (minutes, FrequencyUnit::Minute)
        };

        let multiple = u32::try_from(multiple).map_err(|_| {
            ForecastError::DataError(format!("Sampling gap {} is too large", gap))
        })?;
        Self::new(multiple, unit)
    }

    /// Infer the frequency of a timestamp column.
    ///
    /// A 28-day gap that is also one calendar month (Feb 1 -> Mar 1) is read
    /// as monthly unless the next gap is 28 days as well.
    pub fn infer_from(stamps: &[NaiveDateTime]) -> Result<Self> {
        let (first, second) = match stamps {
            [first, second, ..] => (*first, *second),
            _ => {
                return Err(ForecastError::DataError(
                    "Need two rows to infer the frequency".to_string(),
                ))
            }
        };
        let freq = Self::infer(first, second)?;
        let four_weeks = Duration::weeks(4);
        if freq.unit == FrequencyUnit::Month && second - first == four_weeks {
            if let Some(third) = stamps.get(2) {
                if *third - second == four_weeks {
                    return Self::new(4, FrequencyUnit::Week);
                }
            }
        }
        Ok(freq)
    }
}

// One calendar month later, or a 29 to 31 day gap into another month
fn is_one_month(first: NaiveDateTime, second: NaiveDateTime, gap: Duration) -> bool {
    if !(28..=31).contains(&gap.num_days()) || gap.num_seconds() % 86_400 != 0 {
        return false;
    }
    if first.checked_add_months(Months::new(1)) == Some(second) {
        return true;
    }
    gap.num_days() > 28 && first.month() != second.month()
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.multiple, self.unit.code())
    }
}

impl FromStr for Frequency {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| ForecastError::DataError(format!("Frequency '{}' has no unit", s)))?;
        let (digits, code) = trimmed.split_at(split);

        let multiple = if digits.is_empty() {
            1
        } else {
            digits.parse::<u32>().map_err(|e| {
                ForecastError::DataError(format!("Bad frequency multiple in '{}': {}", s, e))
            })?
        };

        let unit = match code {
            "min" | "T" => FrequencyUnit::Minute,
            "H" | "h" => FrequencyUnit::Hour,
            "D" | "d" => FrequencyUnit::Day,
            "W" | "w" => FrequencyUnit::Week,
            "M" | "MS" => FrequencyUnit::Month,
            other => {
                return Err(ForecastError::DataError(format!(
                    "Unsupported frequency unit '{}'",
                    other
                )))
            }
        };

        Self::new(multiple, unit)
    }
}

impl TryFrom<String> for Frequency {
    type Error = ForecastError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.to_string()
    }
}

/// One target series of a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    id: usize,
    label: String,
    values: Vec<f64>,
}

impl Series {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Display label, `series_<id>` unless the source named it
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Series sharing a start timestamp, a frequency and a length.
///
/// Ids are positional: the series at index `i` has id `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    start: NaiveDateTime,
    freq: Frequency,
    series: Vec<Series>,
    covariates: Option<Vec<Vec<f64>>>,
}

/// Training prefix and full test series produced from one dataset
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    /// The first `len - prediction_length` steps
    pub train: Dataset,
    /// The whole series, train segment followed by the held-out tail
    pub test: Dataset,
    /// Number of held-out steps at the end of `test`
    pub prediction_length: usize,
}

impl Dataset {
    /// Create a dataset from one value vector per series
    pub fn new(start: NaiveDateTime, freq: Frequency, values: Vec<Vec<f64>>) -> Result<Self> {
        let labels = (0..values.len()).map(|i| format!("series_{}", i)).collect();
        Self::with_labels(start, freq, values, labels)
    }

    /// Create a dataset with explicit series labels
    pub fn with_labels(
        start: NaiveDateTime,
        freq: Frequency,
        values: Vec<Vec<f64>>,
        labels: Vec<String>,
    ) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::DataError(
                "A dataset needs at least one series".to_string(),
            ));
        }
        if labels.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "{} labels given for {} series",
                labels.len(),
                values.len()
            )));
        }
        check_rectangular(&values, "series")?;

        let series = values
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(id, (values, label))| Series { id, label, values })
            .collect();

        Ok(Self {
            start,
            freq,
            series,
            covariates: None,
        })
    }

    /// Attach covariate series sampled on the same grid
    pub fn with_covariates(mut self, covariates: Vec<Vec<f64>>) -> Result<Self> {
        if covariates.is_empty() {
            self.covariates = None;
            return Ok(self);
        }
        check_rectangular(&covariates, "covariate")?;
        if covariates.len() != self.num_series() {
            return Err(ForecastError::ShapeMismatch(format!(
                "Targets have {} series but covariates have {}",
                self.num_series(),
                covariates.len()
            )));
        }
        if covariates[0].len() != self.len() {
            return Err(ForecastError::DataError(format!(
                "Covariates have {} steps but targets have {}",
                covariates[0].len(),
                self.len()
            )));
        }
        self.covariates = Some(covariates);
        Ok(self)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn freq(&self) -> Frequency {
        self.freq
    }

    /// Number of time steps
    pub fn len(&self) -> usize {
        self.series[0].values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_series(&self) -> usize {
        self.series.len()
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn get(&self, id: usize) -> Option<&Series> {
        self.series.get(id)
    }

    /// Values of every series, series-major
    pub fn values(&self) -> Vec<&[f64]> {
        self.series.iter().map(|s| s.values.as_slice()).collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.label.as_str()).collect()
    }

    pub fn covariates(&self) -> Option<&[Vec<f64>]> {
        self.covariates.as_deref()
    }

    /// Timestamp of step `index`
    pub fn timestamp_at(&self, index: usize) -> Result<NaiveDateTime> {
        self.freq.step(self.start, index)
    }

    pub fn timestamps(&self) -> Result<Vec<NaiveDateTime>> {
        (0..self.len()).map(|i| self.timestamp_at(i)).collect()
    }

    /// Same series with every value replaced by `f(series_id, value)`
    pub fn map_values<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, &[f64]) -> Result<Vec<f64>>,
    {
        let mut series = Vec::with_capacity(self.series.len());
        for s in &self.series {
            let values = f(s.id, &s.values)?;
            if values.len() != s.values.len() {
                return Err(ForecastError::ShapeMismatch(format!(
                    "Series {} changed length from {} to {}",
                    s.id,
                    s.values.len(),
                    values.len()
                )));
            }
            series.push(Series {
                id: s.id,
                label: s.label.clone(),
                values,
            });
        }
        Ok(Self {
            start: self.start,
            freq: self.freq,
            series,
            covariates: self.covariates.clone(),
        })
    }

    /// Steps `range` of every series and covariate, with the start moved accordingly
    pub fn slice(&self, range: Range<usize>) -> Result<Self> {
        if range.start >= range.end || range.end > self.len() {
            return Err(ForecastError::DataError(format!(
                "Slice {:?} is out of bounds for length {}",
                range,
                self.len()
            )));
        }

        let series = self
            .series
            .iter()
            .map(|s| Series {
                id: s.id,
                label: s.label.clone(),
                values: s.values[range.clone()].to_vec(),
            })
            .collect();
        let covariates = self.covariates.as_ref().map(|cov| {
            cov.iter()
                .map(|row| row[range.clone()].to_vec())
                .collect::<Vec<_>>()
        });

        Ok(Self {
            start: self.timestamp_at(range.start)?,
            freq: self.freq,
            series,
            covariates,
        })
    }

    /// Hold out the last `prediction_length` steps.
    ///
    /// The train split never sees the held-out tail; the test split is the
    /// full series.
    pub fn train_test_split(&self, prediction_length: usize) -> Result<TrainTestSplit> {
        if prediction_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "prediction_length must be at least 1".to_string(),
            ));
        }
        if self.len() <= prediction_length {
            return Err(ForecastError::InsufficientHistory {
                needed: prediction_length + 1,
                got: self.len(),
            });
        }

        let boundary = self.len() - prediction_length;
        debug!(boundary, len = self.len(), "Splitting dataset");
        Ok(TrainTestSplit {
            train: self.slice(0..boundary)?,
            test: self.clone(),
            prediction_length,
        })
    }
}

fn check_rectangular(rows: &[Vec<f64>], what: &str) -> Result<()> {
    let len = rows[0].len();
    if len == 0 {
        return Err(ForecastError::DataError(format!("Empty {} data", what)));
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != len {
            return Err(ForecastError::DataError(format!(
                "{} {} has {} steps, expected {}",
                what,
                i,
                row.len(),
                len
            )));
        }
        if let Some(bad) = row.iter().find(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "{} {} contains non-finite value {}",
                what, i, bad
            )));
        }
    }
    Ok(())
}

/// Data loader for raw multivariate files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a wide CSV: a timestamp column followed by one column per series.
    ///
    /// The frequency is inferred from the first two rows unless given.
    pub fn from_csv<P: AsRef<Path>>(path: P, freq: Option<Frequency>) -> Result<Dataset> {
        let file = File::open(path.as_ref())?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        info!(
            path = %path.as_ref().display(),
            rows = df.height(),
            columns = df.width(),
            "Loaded raw series file"
        );
        Self::from_dataframe(&df, freq)
    }

    /// Build a dataset from a DataFrame laid out like [`DataLoader::from_csv`] expects
    pub fn from_dataframe(df: &DataFrame, freq: Option<Frequency>) -> Result<Dataset> {
        let (time_col, value_cols) = df.get_columns().split_first().ok_or_else(|| {
            ForecastError::DataError("No columns found in data".to_string())
        })?;
        if value_cols.is_empty() {
            return Err(ForecastError::DataError(
                "No series columns found after the timestamp column".to_string(),
            ));
        }

        let stamps = time_col
            .cast(&DataType::Utf8)?
            .utf8()?
            .into_iter()
            .map(|raw| {
                raw.ok_or_else(|| ForecastError::DataError("Missing timestamp".to_string()))
                    .and_then(parse_timestamp)
            })
            .collect::<Result<Vec<_>>>()?;
        let start = *stamps
            .first()
            .ok_or_else(|| ForecastError::DataError("No rows found in data".to_string()))?;

        let freq = match freq {
            Some(freq) => freq,
            None => Frequency::infer_from(&stamps)?,
        };

        let mut values = Vec::with_capacity(value_cols.len());
        let mut labels = Vec::with_capacity(value_cols.len());
        for col in value_cols {
            let column = col
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    v.ok_or_else(|| {
                        ForecastError::DataError(format!(
                            "Missing value in column '{}' at row {}",
                            col.name(),
                            row
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            values.push(column);
            labels.push(col.name().to_string());
        }

        Dataset::with_labels(start, freq, values, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_frequency_parse_and_display() {
        let hourly: Frequency = "H".parse().unwrap();
        assert_eq!(hourly, Frequency::hourly());
        assert_eq!(hourly.to_string(), "1H");

        let quarter: Frequency = "15min".parse().unwrap();
        assert_eq!(quarter.multiple(), 15);
        assert_eq!(quarter.unit(), FrequencyUnit::Minute);

        assert!("B".parse::<Frequency>().is_err());
        assert!("0H".parse::<Frequency>().is_err());
        assert!("12".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_frequency_step() {
        let start = ts("2014-01-01 00:00:00");
        assert_eq!(
            Frequency::hourly().step(start, 25).unwrap(),
            ts("2014-01-02 01:00:00")
        );
        let monthly: Frequency = "M".parse().unwrap();
        assert_eq!(
            monthly.step(ts("2014-01-31 00:00:00"), 1).unwrap(),
            ts("2014-02-28 00:00:00")
        );
    }

    #[test]
    fn test_frequency_infer() {
        let a = ts("2014-01-01 00:00:00");
        assert_eq!(
            Frequency::infer(a, ts("2014-01-01 01:00:00")).unwrap(),
            Frequency::hourly()
        );
        assert_eq!(
            Frequency::infer(a, ts("2014-01-02 00:00:00")).unwrap(),
            Frequency::daily()
        );
        assert!(Frequency::infer(a, a).is_err());
    }

    #[test]
    fn test_four_weekly_is_not_monthly() {
        let stamps = [ts("2014-01-01 00:00:00"), ts("2014-01-29 00:00:00")];
        let freq = Frequency::infer_from(&stamps).unwrap();
        assert_eq!(freq, Frequency::new(4, FrequencyUnit::Week).unwrap());
        assert_eq!(freq.step(stamps[0], 1).unwrap(), stamps[1]);

        // Feb 1 -> Mar 1 looks monthly until the third row
        let stamps = [
            ts("2015-02-01 00:00:00"),
            ts("2015-03-01 00:00:00"),
            ts("2015-03-29 00:00:00"),
        ];
        assert_eq!(Frequency::infer_from(&stamps).unwrap().unit(), FrequencyUnit::Week);
        let monthly = [stamps[0], stamps[1], ts("2015-04-01 00:00:00")];
        assert_eq!(Frequency::infer_from(&monthly).unwrap().unit(), FrequencyUnit::Month);
    }

    #[test]
    fn test_month_end_is_monthly() {
        let stamps = [
            ts("2014-01-31 00:00:00"),
            ts("2014-02-28 00:00:00"),
            ts("2014-03-31 00:00:00"),
        ];
        let freq = Frequency::infer_from(&stamps).unwrap();
        assert_eq!(freq.unit(), FrequencyUnit::Month);
        assert_eq!(
            Frequency::infer(stamps[1], stamps[2]).unwrap().unit(),
            FrequencyUnit::Month
        );
        assert!(Frequency::infer_from(&stamps[..1]).is_err());
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let expected = NaiveDate::from_ymd_opt(2012, 1, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        assert_eq!(ts("2012-01-01 06:00:00"), expected);
        assert_eq!(ts("2012-01-01T06:00:00"), expected);
        assert_eq!(ts("2012-01-01T06:00:00Z"), expected);
        assert_eq!(format_timestamp(&expected), "2012-01-01 06:00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_dataset_rejects_ragged_series() {
        let start = ts("2014-01-01 00:00:00");
        let result = Dataset::new(start, Frequency::hourly(), vec![vec![1.0, 2.0], vec![1.0]]);
        assert!(matches!(result, Err(ForecastError::DataError(_))));

        let result = Dataset::new(start, Frequency::hourly(), vec![vec![1.0, f64::NAN]]);
        assert!(matches!(result, Err(ForecastError::DataError(_))));
    }
}
