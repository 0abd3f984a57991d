//! Aggregation of per-fold metrics into a mean with a t-interval.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// A metric mean with its two-sided confidence interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    /// Number of folds that contributed.
    pub n: usize,
}

/// Aggregation failures.
///
/// Reported explicitly instead of producing a misleading interval from a
/// single point; the caller decides whether the run as a whole still
/// succeeded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    /// The t-interval is undefined below 2 samples.
    #[error("confidence interval needs at least 2 samples, got {0}")]
    InsufficientSamples(usize),

    /// Confidence must be in (0, 1).
    #[error("confidence must be in (0, 1), got {0}")]
    InvalidConfidence(f64),
}

/// Sample mean and two-sided confidence interval from a Student-t
/// distribution with `n - 1` degrees of freedom and the standard error of
/// the mean.
///
/// # Errors
///
/// [`AggregateError::InsufficientSamples`] when `values.len() < 2`,
/// [`AggregateError::InvalidConfidence`] for a confidence outside (0, 1).
pub fn summarize(values: &[f64], confidence: f64) -> Result<Summary, AggregateError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(AggregateError::InvalidConfidence(confidence));
    }
    let n = values.len();
    if n < 2 {
        return Err(AggregateError::InsufficientSamples(n));
    }

    let nf = n as f64;
    let mean = values.iter().sum::<f64>() / nf;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (nf - 1.0);
    let standard_error = (variance / nf).sqrt();

    let t = StudentsT::new(0.0, 1.0, nf - 1.0)
        .map_err(|_| AggregateError::InsufficientSamples(n))?;
    let half_width = t.inverse_cdf(1.0 - (1.0 - confidence) / 2.0) * standard_error;

    Ok(Summary {
        mean,
        lower: mean - half_width,
        upper: mean + half_width,
        n,
    })
}
