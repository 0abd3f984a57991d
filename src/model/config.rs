//! Typed parameter groups for the cause-specific network.
//!
//! Parameters are grouped by concern:
//! - [`Topology`]: network structure, fixed across a whole evaluation
//! - [`HyperParams`]: the values a grid search ranges over
//! - [`TrainControl`]: optimization control, not searched
//!
//! Each group has defaults and a validation method.

use serde::Deserialize;

// =============================================================================
// Validation Errors
// =============================================================================

/// Parameter validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    /// learning_rate must be > 0.
    #[error("learning_rate must be > 0, got {0}")]
    InvalidLearningRate(f32),

    /// alpha (likelihood/ranking blend) must be in [0, 1].
    #[error("alpha must be in [0, 1], got {0}")]
    InvalidAlpha(f32),

    /// sigma (ranking sharpness) must be > 0.
    #[error("sigma must be > 0, got {0}")]
    InvalidSigma(f32),

    /// dropout must be in [0, 1).
    #[error("dropout must be in [0, 1), got {0}")]
    InvalidDropout(f32),

    /// batch_size must be at least 1.
    #[error("batch_size must be at least 1")]
    InvalidBatchSize,

    /// n_risks must be at least 1.
    #[error("n_risks must be at least 1")]
    InvalidNRisks,

    /// Layer widths must be non-zero.
    #[error("layer widths must be non-zero")]
    ZeroLayerWidth,

    /// l2 must be >= 0.
    #[error("l2 must be >= 0, got {0}")]
    InvalidL2(f32),

    /// max_epochs must be at least 1.
    #[error("max_epochs must be at least 1")]
    InvalidMaxEpochs,
}

// =============================================================================
// Topology
// =============================================================================

/// Network structure: a shared trunk feeding one subnetwork per risk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Topology {
    /// Widths of the shared representation layers.
    pub shared_dims: Vec<usize>,
    /// Widths of the hidden layers in each risk-specific subnetwork.
    pub risk_dims: Vec<usize>,
    /// Number of competing risks (independent subnetworks).
    pub n_risks: usize,
    /// L2 penalty applied to all weights during training.
    pub l2: f32,
    /// Whether to batch-normalize after each hidden linear layer.
    pub batch_norm: bool,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            shared_dims: vec![32, 32],
            risk_dims: vec![16],
            n_risks: 2,
            l2: 1e-4,
            batch_norm: true,
        }
    }
}

impl Topology {
    /// Validate the topology.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.n_risks == 0 {
            return Err(ParamError::InvalidNRisks);
        }
        if self.shared_dims.iter().chain(&self.risk_dims).any(|&w| w == 0) {
            return Err(ParamError::ZeroLayerWidth);
        }
        if !(self.l2 >= 0.0) {
            return Err(ParamError::InvalidL2(self.l2));
        }
        Ok(())
    }
}

// =============================================================================
// HyperParams
// =============================================================================

/// One point of the hyperparameter search space.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HyperParams {
    /// Adam step size.
    pub learning_rate: f32,
    /// Blend between the likelihood term (`alpha`) and the ranking term
    /// (`1 - alpha`).
    pub alpha: f32,
    /// Ranking sharpness: smaller values penalize mis-ordered pairs harder.
    pub sigma: f32,
    /// Dropout rate applied after every hidden layer.
    pub dropout: f32,
    /// Minibatch size.
    pub batch_size: usize,
}

impl Default for HyperParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            alpha: 0.2,
            sigma: 0.1,
            dropout: 0.1,
            batch_size: 64,
        }
    }
}

impl HyperParams {
    /// Validate the hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError`] if any value is invalid.
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.learning_rate > 0.0) {
            return Err(ParamError::InvalidLearningRate(self.learning_rate));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(ParamError::InvalidAlpha(self.alpha));
        }
        if !(self.sigma > 0.0) {
            return Err(ParamError::InvalidSigma(self.sigma));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ParamError::InvalidDropout(self.dropout));
        }
        if self.batch_size == 0 {
            return Err(ParamError::InvalidBatchSize);
        }
        Ok(())
    }
}

// =============================================================================
// TrainControl
// =============================================================================

/// Optimization control shared by every grid-search candidate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrainControl {
    /// Upper bound on training epochs.
    pub max_epochs: usize,
    /// Epochs without validation improvement before stopping.
    pub patience: usize,
}

impl Default for TrainControl {
    fn default() -> Self {
        Self {
            max_epochs: 128,
            patience: 10,
        }
    }
}

impl TrainControl {
    /// Validate the control settings.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError::InvalidMaxEpochs`] if `max_epochs` is zero.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.max_epochs == 0 {
            return Err(ParamError::InvalidMaxEpochs);
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Topology::default().validate().is_ok());
        assert!(HyperParams::default().validate().is_ok());
        assert!(TrainControl::default().validate().is_ok());
    }

    #[test]
    fn topology_rejects_zero_width() {
        let topo = Topology {
            shared_dims: vec![32, 0],
            ..Default::default()
        };
        assert_eq!(topo.validate(), Err(ParamError::ZeroLayerWidth));
    }

    #[test]
    fn topology_rejects_zero_risks() {
        let topo = Topology {
            n_risks: 0,
            ..Default::default()
        };
        assert_eq!(topo.validate(), Err(ParamError::InvalidNRisks));
    }

    #[test]
    fn hyper_params_bounds() {
        let bad_lr = HyperParams {
            learning_rate: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_lr.validate(),
            Err(ParamError::InvalidLearningRate(_))
        ));

        let bad_alpha = HyperParams {
            alpha: 1.5,
            ..Default::default()
        };
        assert!(matches!(bad_alpha.validate(), Err(ParamError::InvalidAlpha(_))));

        let bad_dropout = HyperParams {
            dropout: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_dropout.validate(),
            Err(ParamError::InvalidDropout(_))
        ));

        let bad_batch = HyperParams {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(bad_batch.validate(), Err(ParamError::InvalidBatchSize));
    }
}
