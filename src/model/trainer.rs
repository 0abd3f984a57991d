//! Minibatch training loop for [`CauseSpecificNet`].

use log::debug;
use ndarray::{Array3, ArrayView2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::DiscreteLabels;
use crate::utils::derive_seed;

use super::config::{HyperParams, TrainControl};
use super::layers::AdamStep;
use super::loss::loss_and_grad;
use super::net::CauseSpecificNet;
use super::{ModelError, RiskModel};

/// Stream id separating the minibatch-shuffle RNG from weight init.
const SHUFFLE_STREAM: u64 = 0x51;

// =============================================================================
// EarlyStopping
// =============================================================================

/// Early stopping on a lower-is-better validation value.
///
/// Signals when no improvement has been seen for a patience window.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    best_value: Option<f32>,
    best_round: usize,
    current_round: usize,
}

impl EarlyStopping {
    /// Create a callback stopping after `patience` rounds without improvement.
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            best_value: None,
            best_round: 0,
            current_round: 0,
        }
    }

    /// Update with the round's value; returns `true` when training should stop.
    pub fn should_stop(&mut self, value: f32) -> bool {
        let improved = match self.best_value {
            None => true,
            Some(best) => value < best,
        };
        if improved {
            self.best_value = Some(value);
            self.best_round = self.current_round;
        }
        self.current_round += 1;
        self.current_round - self.best_round > self.patience
    }

    /// Best value observed so far.
    pub fn best_value(&self) -> Option<f32> {
        self.best_value
    }

    /// Round at which the best value was observed.
    pub fn best_round(&self) -> usize {
        self.best_round
    }
}

// =============================================================================
// RiskModel for CauseSpecificNet
// =============================================================================

impl RiskModel for CauseSpecificNet {
    fn fit(
        &mut self,
        features: ArrayView2<'_, f32>,
        labels: &DiscreteLabels,
        val_features: ArrayView2<'_, f32>,
        val_labels: &DiscreteLabels,
        hyper: &HyperParams,
        control: &TrainControl,
        seed: u64,
    ) -> Result<(), ModelError> {
        hyper.validate()?;
        control.validate()?;
        let n = features.nrows();
        if n == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if labels.bins.len() != n {
            return Err(ModelError::ShapeMismatch {
                field: "labels",
                expected: n,
                got: labels.bins.len(),
            });
        }
        if val_labels.bins.len() != val_features.nrows() {
            return Err(ModelError::ShapeMismatch {
                field: "validation labels",
                expected: val_features.nrows(),
                got: val_labels.bins.len(),
            });
        }

        let n_risks = self.n_risks();
        let n_bins = self.n_bins();
        let l2 = self.topology().l2;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(derive_seed(seed, SHUFFLE_STREAM));
        let mut early = EarlyStopping::new(control.patience);
        let mut best: Option<(f32, CauseSpecificNet)> = None;
        let mut order: Vec<usize> = (0..n).collect();
        let mut adam_t = 0i32;

        for epoch in 0..control.max_epochs {
            order.shuffle(&mut rng);
            for chunk in order.chunks(hyper.batch_size) {
                let xb = features.select(Axis(0), chunk);
                let bins: Vec<usize> = chunk.iter().map(|&i| labels.bins[i]).collect();
                let events: Vec<u32> = chunk.iter().map(|&i| labels.events[i]).collect();

                adam_t += 1;
                let step = AdamStep {
                    lr: hyper.learning_rate,
                    l2,
                    t: adam_t,
                };
                let (logits, cache) = self.forward_train(xb.view(), hyper.dropout, &mut rng);
                let pmf = super::loss::softmax_padded(&logits);
                let (loss, grad) = loss_and_grad(
                    &pmf,
                    &bins,
                    &events,
                    n_risks,
                    n_bins,
                    hyper.alpha,
                    hyper.sigma,
                    true,
                );
                if !loss.total.is_finite() {
                    return Err(ModelError::NonFiniteLoss { epoch });
                }
                self.backward(&cache, grad.expect("gradient requested"), &step);
            }

            let val_pmf = self.pmf(val_features);
            let (val_loss, _) = loss_and_grad(
                &val_pmf,
                &val_labels.bins,
                &val_labels.events,
                n_risks,
                n_bins,
                hyper.alpha,
                hyper.sigma,
                false,
            );
            if !val_loss.total.is_finite() {
                return Err(ModelError::NonFiniteLoss { epoch });
            }
            if best
                .as_ref()
                .map_or(true, |(value, _)| val_loss.total < *value)
            {
                best = Some((val_loss.total, self.clone()));
            }
            if early.should_stop(val_loss.total) {
                debug!(
                    "early stop at epoch {epoch}, best validation loss {:.6} (epoch {})",
                    early.best_value().unwrap_or(f32::NAN),
                    early.best_round()
                );
                break;
            }
        }

        // Restore the parameters from the best validation epoch.
        if let Some((_, snapshot)) = best {
            *self = snapshot;
        }
        Ok(())
    }

    fn predict_cif(&self, features: ArrayView2<'_, f32>) -> Array3<f32> {
        self.cumulative_incidence(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Topology;
    use ndarray::Array2;

    #[test]
    fn early_stopping_no_stop_while_improving() {
        let mut early = EarlyStopping::new(3);
        assert!(!early.should_stop(1.0));
        assert!(!early.should_stop(0.9));
        assert!(!early.should_stop(0.8));
        assert!(!early.should_stop(0.7));
        assert_eq!(early.best_round(), 3);
        assert!((early.best_value().unwrap() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn early_stopping_stops_after_patience() {
        let mut early = EarlyStopping::new(3);
        assert!(!early.should_stop(0.5)); // best at round 0
        assert!(!early.should_stop(0.6));
        assert!(!early.should_stop(0.7));
        assert!(early.should_stop(0.8)); // 4 rounds past the best
        assert_eq!(early.best_round(), 0);
    }

    #[test]
    fn early_stopping_resets_on_improvement() {
        let mut early = EarlyStopping::new(2);
        assert!(!early.should_stop(1.0));
        assert!(!early.should_stop(1.1));
        assert!(!early.should_stop(0.9)); // new best resets the window
        assert!(!early.should_stop(1.0));
        assert!(early.should_stop(1.0));
        assert_eq!(early.best_round(), 2);
    }

    fn toy_problem() -> (Array2<f32>, DiscreteLabels) {
        // One binary feature; feature=1 rows die early of risk 1,
        // feature=0 rows are censored late.
        let n = 40;
        let features = Array2::from_shape_fn((n, 1), |(i, _)| (i % 2) as f32);
        let bins: Vec<usize> = (0..n).map(|i| if i % 2 == 1 { 0 } else { 3 }).collect();
        let events: Vec<u32> = (0..n).map(|i| if i % 2 == 1 { 1 } else { 0 }).collect();
        (features, DiscreteLabels { bins, events })
    }

    #[test]
    fn fit_learns_a_separable_toy_problem() {
        let topo = Topology {
            shared_dims: vec![8],
            risk_dims: vec![4],
            n_risks: 1,
            l2: 0.0,
            batch_norm: false,
        };
        let (x, labels) = toy_problem();
        let mut net = CauseSpecificNet::new(1, 4, &topo, 7).unwrap();
        let hyper = HyperParams {
            learning_rate: 0.05,
            alpha: 1.0,
            sigma: 0.1,
            dropout: 0.0,
            batch_size: 8,
        };
        let control = TrainControl {
            max_epochs: 60,
            patience: 60,
        };
        net.fit(
            x.view(),
            &labels,
            x.view(),
            &labels,
            &hyper,
            &control,
            123,
        )
        .unwrap();

        // High-risk subjects must get higher early incidence.
        let cif = net.predict_cif(x.view());
        let low = cif[[0, 0, 0]]; // feature = 0
        let high = cif[[0, 0, 1]]; // feature = 1
        assert!(
            high > low,
            "expected early CIF for the high-risk profile ({high}) above the low-risk one ({low})"
        );
    }

    #[test]
    fn fit_rejects_misaligned_labels() {
        let topo = Topology {
            shared_dims: vec![4],
            risk_dims: vec![2],
            n_risks: 1,
            l2: 0.0,
            batch_norm: false,
        };
        let (x, labels) = toy_problem();
        let mut net = CauseSpecificNet::new(1, 4, &topo, 7).unwrap();
        let short = DiscreteLabels {
            bins: labels.bins[..10].to_vec(),
            events: labels.events[..10].to_vec(),
        };
        let result = net.fit(
            x.view(),
            &short,
            x.view(),
            &labels,
            &HyperParams::default(),
            &TrainControl::default(),
            1,
        );
        assert!(matches!(result, Err(ModelError::ShapeMismatch { .. })));
    }
}
