//! The experiment configuration surface (TOML).
//!
//! [`ExperimentConfig`] is the file-level mirror of the programmatic API:
//! dataset location and column names, the CV shape, the hyperparameter
//! grid, the network topology, training control, and the output directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::ColumnSpec;
use crate::eval::{ConfigError, EvalConfig, SearchGrid};
use crate::model::{Topology, TrainControl};

/// Errors loading an experiment file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("cannot parse experiment config: {0}")]
    Parse(#[from] toml::de::Error),
}

fn default_folds() -> usize {
    5
}
fn default_repeats() -> usize {
    1
}
fn default_validation_fraction() -> f64 {
    0.2
}
fn default_bins() -> usize {
    10
}
fn default_confidence() -> f64 {
    0.95
}
fn default_seed() -> u64 {
    42
}

/// A full experiment: data, CV shape, search space, model, output.
///
/// The number of risks comes from `topology.n_risks` and doubles as the
/// bound on valid event codes in the dataset.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// CSV dataset location.
    pub dataset: PathBuf,
    /// Name of the continuous-time column.
    pub time_column: String,
    /// Name of the integer event-code column.
    pub event_column: String,
    /// Categorical and continuous covariate columns.
    pub columns: ColumnSpec,
    /// Maximum follow-up horizon; observed times are clipped to it.
    #[serde(default)]
    pub horizon: Option<f64>,

    #[serde(default = "default_folds")]
    pub folds: usize,
    #[serde(default = "default_repeats")]
    pub repeats: usize,
    #[serde(default = "default_validation_fraction")]
    pub validation_fraction: f64,
    #[serde(default = "default_bins")]
    pub n_bins: usize,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub n_threads: usize,

    /// Hyperparameter candidate lists.
    #[serde(default)]
    pub grid: SearchGrid,
    /// Network topology (including the number of risks).
    #[serde(default)]
    pub topology: Topology,
    /// Training control shared by every candidate.
    #[serde(default)]
    pub training: TrainControl,

    /// Directory receiving one prediction table per fold.
    pub output_dir: PathBuf,
}

impl ExperimentConfig {
    /// Load and parse a TOML experiment file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError`] on filesystem or parse problems.
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Build the validated [`EvalConfig`] for this experiment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the CV shape is invalid.
    pub fn eval_config(&self) -> Result<EvalConfig, ConfigError> {
        EvalConfig::builder()
            .folds(self.folds)
            .repeats(self.repeats)
            .validation_fraction(self.validation_fraction)
            .n_bins(self.n_bins)
            .confidence(self.confidence)
            .seed(self.seed)
            .n_threads(self.n_threads)
            .build()
    }
}
