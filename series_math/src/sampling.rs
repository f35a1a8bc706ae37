//! Per-step statistics over sampled forecast paths
//!
//! A probabilistic forecast for one series is a set of sample paths, each one
//! `prediction_length` long. These helpers collapse the paths step by step.

use crate::{MathError, Result};
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Check that every path has the same, non-zero length and return it
pub fn path_length<S: AsRef<[f64]>>(paths: &[S]) -> Result<usize> {
    let first = paths.first().ok_or_else(|| {
        MathError::InsufficientData("At least one sample path is required".to_string())
    })?;
    let len = first.as_ref().len();
    if len == 0 {
        return Err(MathError::InsufficientData(
            "Sample paths must not be empty".to_string(),
        ));
    }
    for path in paths {
        if path.as_ref().len() != len {
            return Err(MathError::LengthMismatch {
                expected: len,
                got: path.as_ref().len(),
            });
        }
    }
    Ok(len)
}

/// Mean of the samples at each step
pub fn sample_mean<S: AsRef<[f64]>>(paths: &[S]) -> Result<Vec<f64>> {
    let len = path_length(paths)?;
    Ok((0..len)
        .map(|step| paths.iter().map(|p| p.as_ref()[step]).mean())
        .collect())
}

/// Sample standard deviation at each step; zero when there is a single path
pub fn sample_std_dev<S: AsRef<[f64]>>(paths: &[S]) -> Result<Vec<f64>> {
    let len = path_length(paths)?;
    if paths.len() < 2 {
        return Ok(vec![0.0; len]);
    }
    Ok((0..len)
        .map(|step| paths.iter().map(|p| p.as_ref()[step]).std_dev())
        .collect())
}

/// Empirical quantile of the samples at each step
pub fn sample_quantile<S: AsRef<[f64]>>(paths: &[S], q: f64) -> Result<Vec<f64>> {
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must lie in [0, 1], got {}",
            q
        )));
    }
    let len = path_length(paths)?;
    Ok((0..len)
        .map(|step| {
            let column: Vec<f64> = paths.iter().map(|p| p.as_ref()[step]).collect();
            Data::new(column).quantile(q)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn paths() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 10.0, 4.0],
            vec![3.0, 10.0, 5.0],
            vec![2.0, 10.0, 6.0],
        ]
    }

    #[test]
    fn test_sample_mean() {
        let mean = sample_mean(&paths()).unwrap();
        assert_eq!(mean.len(), 3);
        assert_relative_eq!(mean[0], 2.0);
        assert_relative_eq!(mean[1], 10.0);
        assert_relative_eq!(mean[2], 5.0);
    }

    #[test]
    fn test_sample_std_dev() {
        let std = sample_std_dev(&paths()).unwrap();
        assert_relative_eq!(std[0], 1.0);
        assert_relative_eq!(std[1], 0.0);

        let single = sample_std_dev(&[vec![3.0, 4.0]]).unwrap();
        assert_eq!(single, vec![0.0, 0.0]);
    }

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(1.0, 3.0)]
    fn test_sample_quantile_extremes(#[case] q: f64, #[case] expected: f64) {
        let quantile = sample_quantile(&paths(), q).unwrap();
        assert_relative_eq!(quantile[0], expected);
        assert_relative_eq!(quantile[1], 10.0);
    }

    #[test]
    fn test_median_of_odd_sample_count() {
        let median = sample_quantile(&paths(), 0.5).unwrap();
        assert_relative_eq!(median[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(median[2], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ragged_paths_rejected() {
        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        assert_eq!(
            sample_mean(&ragged),
            Err(MathError::LengthMismatch {
                expected: 2,
                got: 1
            })
        );
        let empty: Vec<Vec<f64>> = Vec::new();
        assert!(sample_mean(&empty).is_err());
    }
}
