use lstnet_forecast::data::{parse_timestamp, Dataset, Frequency};
use lstnet_forecast::viz::{SeriesSelection, Split, VizTable};
use lstnet_forecast::{ForecastError, ForecastResponse, SamplePaths};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::fs;
use tempfile::tempdir;

struct Fixture {
    train: Dataset,
    test: Dataset,
    forecast: ForecastResponse,
}

/// Four series: 6 train steps, 2 held-out steps, 2 forecast steps
fn fixture() -> Fixture {
    let start = parse_timestamp("2014-01-01 00:00:00").unwrap();
    let values: Vec<Vec<f64>> = (0..4)
        .map(|s| (0..8).map(|t| (s * 10 + t) as f64).collect())
        .collect();
    let full = Dataset::new(start, Frequency::hourly(), values).unwrap();
    let split = full.train_test_split(2).unwrap();
    let test = split.test.slice(6..8).unwrap();

    let paths: Vec<Vec<f64>> = (0..4).map(|s| vec![s as f64, s as f64 + 1.0]).collect();
    let shifted: Vec<Vec<f64>> = paths
        .iter()
        .map(|p| p.iter().map(|v| v + 2.0).collect())
        .collect();
    let samples = SamplePaths::new(vec![paths, shifted]).unwrap();
    let forecast_start = parse_timestamp("2014-01-01 06:00:00").unwrap();

    Fixture {
        train: split.train,
        test,
        forecast: ForecastResponse::new(samples, forecast_start, Frequency::hourly()),
    }
}

#[test]
fn test_one_row_per_timestamp_series_split() {
    let f = fixture();
    let table = VizTable::assemble(&f.train, &f.test, &f.forecast, &SeriesSelection::First(3)).unwrap();

    assert_eq!(table.len(), 3 * (6 + 2 + 2));

    let keys: HashSet<_> = table
        .rows()
        .iter()
        .map(|r| (r.timestamp, r.series.clone(), r.split))
        .collect();
    assert_eq!(keys.len(), table.len());
    assert!(table.rows().iter().all(|r| r.series != "series_3"));
}

#[test]
fn test_forecast_rows_hold_sample_mean() {
    let f = fixture();
    let table =
        VizTable::assemble(&f.train, &f.test, &f.forecast, &SeriesSelection::Ids(vec![2])).unwrap();

    let forecast: Vec<f64> = table
        .rows()
        .iter()
        .filter(|r| r.split == Split::Forecast)
        .map(|r| r.value)
        .collect();
    assert_eq!(forecast, vec![3.0, 4.0]);

    let test: Vec<f64> = table
        .rows()
        .iter()
        .filter(|r| r.split == Split::Test)
        .map(|r| r.value)
        .collect();
    assert_eq!(test, vec![26.0, 27.0]);
}

#[test]
fn test_seeded_sample_is_stable_and_sorted() {
    let selection = SeriesSelection::Sample { count: 5, seed: 42 };
    let ids = selection.resolve(321).unwrap();
    assert_eq!(ids.len(), 5);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert!(ids.iter().all(|id| *id < 321));
    assert_eq!(ids, selection.resolve(321).unwrap());

    assert_eq!(
        SeriesSelection::Sample { count: 10, seed: 1 }.resolve(4).unwrap(),
        vec![0, 1, 2, 3]
    );
}

#[test]
fn test_unknown_series_id_rejected() {
    assert!(matches!(
        SeriesSelection::Ids(vec![0, 9]).resolve(4),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_frequency_mismatch_rejected() {
    let f = fixture();
    let daily = ForecastResponse::new(f.forecast.samples.clone(), f.forecast.start, Frequency::daily());
    assert!(VizTable::assemble(&f.train, &f.test, &daily, &SeriesSelection::First(1)).is_err());
}

#[test]
fn test_exports() {
    let f = fixture();
    let table = VizTable::assemble(&f.train, &f.test, &f.forecast, &SeriesSelection::First(1)).unwrap();

    let df = table.to_dataframe().unwrap();
    assert_eq!(df.height(), 10);
    assert_eq!(df.get_column_names(), vec!["timestamp", "series", "value", "split"]);

    let dir = tempdir().unwrap();
    let path = dir.path().join("viz.csv");
    table.write_csv(&path).unwrap();
    let written = fs::read_to_string(&path).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some("timestamp,series,value,split"));
    assert_eq!(lines.next(), Some("2014-01-01 00:00:00,series_0,0.0,train"));
    assert_eq!(written.lines().count(), 11);
}
