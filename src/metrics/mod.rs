//! Censoring-corrected evaluation metrics.
//!
//! Both metrics binarize outcomes to "primary event" vs
//! "censored-or-competing" and evaluate the primary-risk incidence curve
//! only - the competing-event curves are exported for downstream analysis
//! but do not enter the reported scores. Censoring weights come from a
//! Kaplan-Meier estimate of the censoring distribution fitted on the
//! evaluation cohort itself.

mod brier;
mod concordance;
mod km;

pub use brier::integrated_brier;
pub use concordance::concordance_td;
pub use km::KaplanMeier;

/// A per-fold metric that could not be computed.
///
/// These are recoverable conditions: the evaluation loop logs them and
/// records the fold's metric as absent instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricError {
    /// No (i, j) pair satisfies the comparability condition - for example a
    /// test fold with zero primary events.
    #[error("no comparable pairs for time-dependent concordance")]
    NoComparablePairs,

    /// Integration over primary-event times is undefined with fewer than two
    /// unique times.
    #[error("integrated Brier score needs at least 2 unique primary-event times, got {0}")]
    DegenerateTimeGrid(usize),
}
