//! The cause-specific discrete-time survival model.
//!
//! The evaluation core treats the predictor as a contract: something that
//! can be fitted on discretized `(bin, event)` labels with a validation set
//! for monitoring, and that predicts a cumulative incidence value per
//! `(risk, time-bin)` pair. That contract is the [`RiskModel`] trait;
//! [`CauseSpecificNet`] is the provided implementation - a shared
//! representation stage feeding one independent subnetwork per risk,
//! trained on a blend of a discrete likelihood term and a ranking term.

mod config;
mod layers;
mod loss;
mod net;
mod trainer;

pub use config::{HyperParams, ParamError, Topology, TrainControl};
pub use net::CauseSpecificNet;
pub use trainer::EarlyStopping;

use ndarray::{Array3, ArrayView2};

use crate::data::DiscreteLabels;

// =============================================================================
// Errors
// =============================================================================

/// Errors surfaced while fitting a model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// A hyperparameter or topology value failed validation.
    #[error(transparent)]
    Param(#[from] ParamError),

    /// No training rows.
    #[error("training set is empty")]
    EmptyTrainingSet,

    /// Row-aligned inputs disagree on length.
    #[error("{field} length mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// Training diverged.
    #[error("loss became non-finite at epoch {epoch}")]
    NonFiniteLoss { epoch: usize },
}

// =============================================================================
// The predictor contract
// =============================================================================

/// A trainable predictor of cause-specific cumulative incidence.
///
/// Implementations must guarantee that every predicted incidence curve is
/// non-decreasing along the time-bin axis. How that is enforced is internal
/// to the implementation ([`CauseSpecificNet`] gets it by construction: the
/// CIF is a running sum of a non-negative PMF).
pub trait RiskModel {
    /// Fit on discretized training labels.
    ///
    /// The validation set is used for monitoring and early stopping only -
    /// it never influences the discretization grid or any other fold-local
    /// preprocessing.
    #[allow(clippy::too_many_arguments)]
    fn fit(
        &mut self,
        features: ArrayView2<'_, f32>,
        labels: &DiscreteLabels,
        val_features: ArrayView2<'_, f32>,
        val_labels: &DiscreteLabels,
        hyper: &HyperParams,
        control: &TrainControl,
        seed: u64,
    ) -> Result<(), ModelError>;

    /// Predict cumulative incidence for every subject.
    ///
    /// Returns `[n_risks, n_bins, n_samples]`, non-decreasing along the
    /// bin axis for every `(risk, subject)` pair.
    fn predict_cif(&self, features: ArrayView2<'_, f32>) -> Array3<f32>;
}
