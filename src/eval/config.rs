//! Evaluation-loop configuration with builder pattern.
//!
//! [`EvalConfig`] carries the cross-validation shape (folds, repeats,
//! validation fraction), the discretization bin count, the confidence level
//! for aggregation, the base seed, and the thread budget. It composes with
//! [`SearchGrid`](super::SearchGrid) and the model parameter groups, and
//! uses the `bon` crate for builder generation with validation at build
//! time.
//!
//! # Example
//!
//! ```
//! use cuminc::EvalConfig;
//!
//! // All defaults
//! let config = EvalConfig::builder().build().unwrap();
//!
//! // Customize the CV shape
//! let config = EvalConfig::builder()
//!     .folds(5)
//!     .repeats(2)
//!     .n_bins(10)
//!     .seed(1234)
//!     .build()
//!     .unwrap();
//! ```

use bon::Builder;

use crate::model::ParamError;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
///
/// These are caller mistakes: they abort the evaluation before any fold
/// executes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A hyperparameter grid axis has no candidates.
    #[error("hyperparameter grid axis '{axis}' is empty")]
    EmptyGrid { axis: &'static str },

    /// Outer fold count must be at least 2.
    #[error("folds must be at least 2, got {0}")]
    InvalidFolds(usize),

    /// Repeat count must be at least 1.
    #[error("repeats must be at least 1, got {0}")]
    InvalidRepeats(usize),

    /// Inner validation fraction must be in (0, 1).
    #[error("validation_fraction must be in (0, 1), got {0}")]
    InvalidValidationFraction(f64),

    /// Discretization bin count must be at least 2.
    #[error("n_bins must be at least 2, got {0}")]
    InvalidBins(usize),

    /// Confidence level must be in (0, 1).
    #[error("confidence must be in (0, 1), got {0}")]
    InvalidConfidence(f64),

    /// A model parameter failed validation.
    #[error(transparent)]
    Param(#[from] ParamError),
}

// =============================================================================
// EvalConfig
// =============================================================================

/// Configuration of the repeated cross-validation loop.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct EvalConfig {
    /// Outer fold count per repeat. Default: 5.
    #[builder(default = 5)]
    pub folds: usize,

    /// Number of repeated K-fold rounds. Default: 1.
    #[builder(default = 1)]
    pub repeats: usize,

    /// Fraction of each outer-train split carved off as the inner
    /// validation set. Default: 0.2.
    #[builder(default = 0.2)]
    pub validation_fraction: f64,

    /// Number of discretization time bins. Default: 10.
    #[builder(default = 10)]
    pub n_bins: usize,

    /// Confidence level for the aggregated intervals. Default: 0.95.
    #[builder(default = 0.95)]
    pub confidence: f64,

    /// Base seed of the deterministic per-fold seed schedule. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    /// Thread count for within-fold grid search: 0 = auto, 1 = sequential,
    /// >1 = exact count. Default: 0.
    #[builder(default = 0)]
    pub n_threads: usize,
}

/// Custom finishing function that validates the config.
impl<S: eval_config_builder::IsComplete> EvalConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid.
    pub fn build(self) -> Result<EvalConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl EvalConfig {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.folds < 2 {
            return Err(ConfigError::InvalidFolds(self.folds));
        }
        if self.repeats == 0 {
            return Err(ConfigError::InvalidRepeats(self.repeats));
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(ConfigError::InvalidValidationFraction(
                self.validation_fraction,
            ));
        }
        if self.n_bins < 2 {
            return Err(ConfigError::InvalidBins(self.n_bins));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(ConfigError::InvalidConfidence(self.confidence));
        }
        Ok(())
    }
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self::builder().build().expect("default config is valid")
    }
}

// =============================================================================
// Tests
// =============================================================================
