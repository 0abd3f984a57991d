//! The repeated cross-validation evaluation core.
//!
//! [`Evaluation`] drives the whole loop for one dataset and one model
//! family: repeated stratified K-fold splitting, per-fold scaling and
//! duration discretization, hyperparameter grid search with
//! validation-based selection, test-set prediction export, per-fold metric
//! computation, and finally aggregation into means with Student-t
//! confidence intervals.
//!
//! Error policy: configuration-level problems (empty grid, bad fractions,
//! bad topology) abort before any fold executes; per-fold problems
//! (degenerate metric, no viable candidate) are logged and recorded as
//! omissions, never aborting the run.

mod aggregate;
mod config;
mod grid;
mod runner;
mod split;

pub use aggregate::{summarize, AggregateError, Summary};
pub use config::{ConfigError, EvalConfig};
pub use grid::SearchGrid;
pub use runner::{CvReport, EvalError, Evaluation, FoldOutcome};
pub use split::{stratified_holdout, FoldSplit, RepeatedStratifiedKFold};
