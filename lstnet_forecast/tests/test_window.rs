use lstnet_forecast::data::{parse_timestamp, Dataset, Frequency};
use lstnet_forecast::{ForecastError, WindowSpec};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn ramp(len: usize, num_series: usize) -> Dataset {
    let start = parse_timestamp("2014-01-01 00:00:00").unwrap();
    let values = (0..num_series)
        .map(|s| (0..len).map(|t| (s * 100 + t) as f64).collect())
        .collect();
    Dataset::new(start, Frequency::hourly(), values).unwrap()
}

#[test]
fn test_length_20_context_12_prediction_6() {
    let dataset = ramp(20, 2);
    let spec = WindowSpec::new(12, 6).unwrap();
    let plan = spec.plan(&dataset).unwrap();

    assert_eq!(plan.training.len(), 3);
    assert_eq!(plan.evaluation.bounds.target, 14..20);
    assert_eq!(plan.evaluation.bounds.context, 2..14);
    assert_eq!(
        plan.evaluation.target_start,
        parse_timestamp("2014-01-01 14:00:00").unwrap()
    );
    assert_eq!(
        plan.evaluation.context_start,
        parse_timestamp("2014-01-01 02:00:00").unwrap()
    );

    let series = dataset.series()[1].values();
    assert_eq!(plan.evaluation.target(series), &[114.0, 115.0, 116.0, 117.0, 118.0, 119.0]);
}

#[rstest]
#[case(18, 12, 6, 1)]
#[case(100, 24, 24, 53)]
#[case(7, 1, 1, 6)]
fn test_window_count(
    #[case] len: usize,
    #[case] context: usize,
    #[case] prediction: usize,
    #[case] expected: usize,
) {
    let spec = WindowSpec::new(context, prediction).unwrap();
    assert_eq!(spec.count(len).unwrap(), expected);
    assert_eq!(spec.training_windows(len).unwrap().len(), expected);
}

#[test]
fn test_windows_stay_inside_series() {
    let spec = WindowSpec::new(5, 3).unwrap();
    for bounds in spec.training_windows(11).unwrap() {
        assert_eq!(bounds.context.len(), 5);
        assert_eq!(bounds.target.len(), 3);
        assert_eq!(bounds.context.end, bounds.target.start);
        assert!(bounds.target.end <= 11);
    }
}

#[test]
fn test_short_series_is_insufficient_history() {
    let dataset = ramp(17, 1);
    let spec = WindowSpec::new(12, 6).unwrap();
    match spec.plan(&dataset) {
        Err(ForecastError::InsufficientHistory { needed, got }) => {
            assert_eq!(needed, 18);
            assert_eq!(got, 17);
        }
        other => panic!("Expected InsufficientHistory, got {:?}", other),
    }
}

#[test]
fn test_zero_lengths_rejected() {
    assert!(matches!(
        WindowSpec::new(0, 6),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(matches!(
        WindowSpec::new(12, 0),
        Err(ForecastError::InvalidParameter(_))
    ));
}
