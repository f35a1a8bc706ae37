//! Accuracy kernels for point and quantile forecasts
//!
//! All functions take the ground truth first and the forecast second and
//! require both slices to be non-empty and of equal length.

use crate::{check_paired, MathError, Result};

/// Sum of squared errors
pub fn squared_error_sum(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    check_paired(actual, forecast)?;
    Ok(actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).powi(2))
        .sum())
}

/// Sum of absolute errors
pub fn abs_error_sum(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    check_paired(actual, forecast)?;
    Ok(actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| (a - f).abs())
        .sum())
}

/// Mean squared error
pub fn mean_squared_error(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    Ok(squared_error_sum(actual, forecast)? / actual.len() as f64)
}

/// Root mean squared error
pub fn root_mean_squared_error(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    Ok(mean_squared_error(actual, forecast)?.sqrt())
}

/// Mean absolute error
pub fn mean_absolute_error(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    Ok(abs_error_sum(actual, forecast)? / actual.len() as f64)
}

/// Symmetric mean absolute percentage error as a fraction in `[0, 2]`.
///
/// Steps where both the truth and the forecast are zero count as zero error.
pub fn symmetric_mape(actual: &[f64], forecast: &[f64]) -> Result<f64> {
    check_paired(actual, forecast)?;

    let total: f64 = actual
        .iter()
        .zip(forecast.iter())
        .map(|(a, f)| {
            let denom = a.abs() + f.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - f).abs() / denom
            }
        })
        .sum();

    Ok(total / actual.len() as f64)
}

/// In-sample mean absolute error of the seasonal naive forecast `y[t - lag]`.
///
/// Returns `None` when the segment is not longer than `lag` or when the naive
/// error is zero; both leave MASE undefined.
pub fn naive_mae(train: &[f64], lag: usize) -> Result<Option<f64>> {
    if lag == 0 {
        return Err(MathError::InvalidInput(
            "Seasonal lag must be at least 1".to_string(),
        ));
    }
    if train.len() <= lag {
        return Ok(None);
    }

    let total: f64 = train
        .iter()
        .skip(lag)
        .zip(train.iter())
        .map(|(current, lagged)| (current - lagged).abs())
        .sum();
    let mae = total / (train.len() - lag) as f64;

    if mae > 0.0 {
        Ok(Some(mae))
    } else {
        Ok(None)
    }
}

/// Mean absolute scaled error against a precomputed naive MAE.
///
/// An undefined denominator yields `None`, never zero or infinity.
pub fn mase(actual: &[f64], forecast: &[f64], naive: Option<f64>) -> Result<Option<f64>> {
    let mae = mean_absolute_error(actual, forecast)?;
    Ok(naive.map(|scale| mae / scale))
}

/// Pinball loss of a quantile forecast, summed over steps and doubled so that
/// the median loss equals the absolute error.
pub fn quantile_loss(actual: &[f64], quantile_forecast: &[f64], q: f64) -> Result<f64> {
    check_paired(actual, quantile_forecast)?;
    if !(q > 0.0 && q < 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must lie in (0, 1), got {}",
            q
        )));
    }

    Ok(actual
        .iter()
        .zip(quantile_forecast.iter())
        .map(|(a, f)| {
            let indicator = if a <= f { 1.0 } else { 0.0 };
            2.0 * ((f - a) * (indicator - q)).abs()
        })
        .sum())
}

/// Fraction of steps where the truth lies below the quantile forecast
pub fn coverage(actual: &[f64], quantile_forecast: &[f64]) -> Result<f64> {
    check_paired(actual, quantile_forecast)?;
    let below = actual
        .iter()
        .zip(quantile_forecast.iter())
        .filter(|(a, f)| a < f)
        .count();
    Ok(below as f64 / actual.len() as f64)
}
