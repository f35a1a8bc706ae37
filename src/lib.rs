//! # LSTNet Workspace
//!
//! Umbrella crate for the forecasting pipeline around an LSTNet model.
//!
//! - [`math`]: numeric kernels (scaling, accuracy measures, sample statistics)
//! - [`forecast`]: data model, normalization, windowing, endpoint protocol,
//!   evaluation and visualization tables
//!
//! ## Example
//!
//! ```
//! use lstnet_workspace::forecast::ScaleFactors;
//!
//! let scales = ScaleFactors::from_scales(vec![4.0])?;
//! assert_eq!(scales.inverse_transform(0, &[0.5, 1.0, 0.25])?, vec![2.0, 4.0, 1.0]);
//! # Ok::<(), lstnet_workspace::forecast::ForecastError>(())
//! ```

pub use lstnet_forecast as forecast;
pub use series_math as math;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_errors_convert() {
        let err: forecast::ForecastError =
            math::MathError::InvalidInput("empty".to_string()).into();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_crate_name() {
        assert_eq!(forecast::NAME, "lstnet_forecast");
    }
}
