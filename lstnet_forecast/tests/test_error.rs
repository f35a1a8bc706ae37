use lstnet_forecast::data::parse_timestamp;
use lstnet_forecast::{ForecastError, RequestContext};
use series_math::MathError;
use std::io;

fn context() -> RequestContext {
    RequestContext {
        series_ids: (0..321).collect(),
        context_start: parse_timestamp("2014-12-24 00:00:00").unwrap(),
        forecast_start: parse_timestamp("2014-12-31 00:00:00").unwrap(),
        context_length: 168,
        prediction_length: 24,
    }
}

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    assert!(matches!(
        ForecastError::from(io_error),
        ForecastError::IoError(_)
    ));

    let math_error = MathError::InvalidInput("lag".to_string());
    assert!(matches!(
        ForecastError::from(math_error),
        ForecastError::Math(_)
    ));

    let json_error = serde_json::from_str::<Vec<f64>>("[1.0,").unwrap_err();
    assert!(matches!(
        ForecastError::from(json_error),
        ForecastError::Json(_)
    ));
}

#[test]
fn test_remote_failure_names_the_window() {
    let error = ForecastError::RemoteCallFailure {
        context: Box::new(context()),
        reason: "timed out after 60s".to_string(),
    };
    let message = error.to_string();

    assert!(message.contains("series 0..=320 (321 series)"));
    assert!(message.contains("context 168 from 2014-12-24 00:00:00"));
    assert!(message.contains("horizon 24 from 2014-12-31 00:00:00"));
    assert!(message.contains("timed out after 60s"));
}

#[test]
fn test_error_display() {
    let error = ForecastError::InsufficientHistory { needed: 18, got: 17 };
    assert_eq!(
        error.to_string(),
        "Insufficient history: need at least 18 steps, got 17"
    );

    let error = ForecastError::ShapeMismatch("8 series vs 7".to_string());
    assert!(error.to_string().contains("8 series vs 7"));

    let single = RequestContext {
        series_ids: vec![5],
        ..context()
    };
    assert!(single.to_string().starts_with("series 5,"));
}
