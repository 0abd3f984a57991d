//! cuminc: competing-risks survival analysis for Rust.
//!
//! Trains discrete-time cause-specific survival models and evaluates them
//! with repeated stratified cross-validation, hyperparameter grid search,
//! and censoring-corrected discrimination and calibration metrics.
//!
//! # Key Types
//!
//! - [`SurvivalDataset`] - Covariates plus (time, event-code) labels
//! - [`Evaluation`] / [`EvalConfig`] - The repeated-CV evaluation loop
//! - [`SearchGrid`] / [`HyperParams`] - Hyperparameter search space
//! - [`CauseSpecificNet`] / [`RiskModel`] - The predictor behind the contract
//! - [`Summary`] - Per-metric mean with a Student-t confidence interval
//!
//! # Evaluation
//!
//! Use `EvalConfig::builder()` to configure, then `Evaluation::new(..).run(..)`.
//! See the [`eval`] module for details.
//!
//! # Loading Tabular Data
//!
//! Use [`io::read_table`] and [`SurvivalDataset::from_table`] to go from a
//! CSV file with named columns to an encoded dataset.

pub mod config;
pub mod data;
pub mod eval;
pub mod io;
pub mod metrics;
pub mod model;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Data types (for preparing evaluation data)
pub use data::{
    ColumnSpec, DataError, DataTable, DiscreteLabels, DurationGrid, FeatureKind, OneHotEncoder,
    StandardScaler, SurvivalDataset,
};

// The evaluation core
pub use eval::{
    summarize, AggregateError, ConfigError, CvReport, EvalConfig, EvalError, Evaluation,
    FoldOutcome, RepeatedStratifiedKFold, SearchGrid, Summary,
};

// Model types
pub use model::{
    CauseSpecificNet, HyperParams, ModelError, ParamError, RiskModel, Topology, TrainControl,
};

// Metrics
pub use metrics::{concordance_td, integrated_brier, KaplanMeier, MetricError};

// Prediction export
pub use io::{CsvSink, FoldPredictions, MemorySink, PredictionSink};

// Experiment configuration surface
pub use config::ExperimentConfig;

// Shared utilities
pub use utils::{run_with_threads, Parallelism};
