//! The cause-specific network: shared trunk + one subnetwork per risk.

use ndarray::{s, Array2, Array3, ArrayView2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use super::config::{ParamError, Topology};
use super::layers::{dropout_mask, AdamStep, BatchNorm, BatchNormCache, Dense};
use super::loss::softmax_padded;

// =============================================================================
// Blocks
// =============================================================================

/// One hidden stage: dense -> optional batch-norm -> ReLU -> dropout.
#[derive(Debug, Clone)]
struct Block {
    dense: Dense,
    norm: Option<BatchNorm>,
}

/// Per-batch values a block's backward pass needs.
#[derive(Debug)]
struct BlockCache {
    input: Array2<f32>,
    bn: Option<BatchNormCache>,
    relu_mask: Array2<f32>,
    drop_mask: Option<Array2<f32>>,
}

impl Block {
    fn new(
        in_dim: usize,
        out_dim: usize,
        batch_norm: bool,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Self {
        Self {
            dense: Dense::new(in_dim, out_dim, rng),
            norm: batch_norm.then(|| BatchNorm::new(out_dim)),
        }
    }

    fn forward_train(
        &mut self,
        x: Array2<f32>,
        dropout: f32,
        rng: &mut Xoshiro256PlusPlus,
    ) -> (Array2<f32>, BlockCache) {
        let z = self.dense.forward(x.view());
        let (z, bn) = match &mut self.norm {
            Some(norm) => {
                let (y, cache) = norm.forward_train(&z);
                (y, Some(cache))
            }
            None => (z, None),
        };
        let relu_mask = z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let mut a = z * &relu_mask;
        let drop_mask = if dropout > 0.0 {
            let mask = dropout_mask(a.dim(), dropout, rng);
            a = a * &mask;
            Some(mask)
        } else {
            None
        };
        (
            a,
            BlockCache {
                input: x,
                bn,
                relu_mask,
                drop_mask,
            },
        )
    }

    fn forward_eval(&self, x: &Array2<f32>) -> Array2<f32> {
        let z = self.dense.forward(x.view());
        let z = match &self.norm {
            Some(norm) => norm.forward_eval(&z),
            None => z,
        };
        z.mapv(|v| v.max(0.0))
    }

    fn backward(&mut self, cache: &BlockCache, grad: Array2<f32>, step: &AdamStep) -> Array2<f32> {
        let grad = match &cache.drop_mask {
            Some(mask) => grad * mask,
            None => grad,
        };
        let grad = grad * &cache.relu_mask;
        let grad = match (&mut self.norm, &cache.bn) {
            (Some(norm), Some(bn)) => norm.backward(bn, &grad, step),
            _ => grad,
        };
        self.dense.backward(cache.input.view(), &grad, step)
    }
}

// =============================================================================
// CauseSpecificNet
// =============================================================================

/// Discrete-time competing-risks network.
///
/// A shared representation stage maps the feature vector to a hidden
/// representation; independent risk-specific stages map that representation
/// to one logit per time bin. The joint softmax over all `(risk, bin)` cells
/// (plus an implicit tail cell) yields a PMF whose running sum is the
/// cumulative incidence function, non-decreasing by construction.
#[derive(Debug, Clone)]
pub struct CauseSpecificNet {
    topology: Topology,
    n_bins: usize,
    shared: Vec<Block>,
    heads: Vec<Vec<Block>>,
    outputs: Vec<Dense>,
}

pub(crate) struct NetCache {
    shared: Vec<BlockCache>,
    heads: Vec<Vec<BlockCache>>,
    head_outs: Vec<Array2<f32>>,
}

impl CauseSpecificNet {
    /// Construct an untrained network with seeded weight initialization.
    ///
    /// # Errors
    ///
    /// Returns [`ParamError`] if the topology is invalid.
    pub fn new(
        in_dim: usize,
        n_bins: usize,
        topology: &Topology,
        seed: u64,
    ) -> Result<Self, ParamError> {
        topology.validate()?;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        let mut shared = Vec::with_capacity(topology.shared_dims.len());
        let mut dim = in_dim;
        for &width in &topology.shared_dims {
            shared.push(Block::new(dim, width, topology.batch_norm, &mut rng));
            dim = width;
        }
        let shared_out_dim = dim;

        let mut heads = Vec::with_capacity(topology.n_risks);
        let mut outputs = Vec::with_capacity(topology.n_risks);
        for _ in 0..topology.n_risks {
            let mut stack = Vec::with_capacity(topology.risk_dims.len());
            let mut dim = shared_out_dim;
            for &width in &topology.risk_dims {
                stack.push(Block::new(dim, width, topology.batch_norm, &mut rng));
                dim = width;
            }
            heads.push(stack);
            outputs.push(Dense::new(dim, n_bins, &mut rng));
        }

        Ok(Self {
            topology: topology.clone(),
            n_bins,
            shared,
            heads,
            outputs,
        })
    }

    /// Network topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Number of competing risks.
    #[inline]
    pub fn n_risks(&self) -> usize {
        self.topology.n_risks
    }

    /// Number of output time bins.
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    // =========================================================================
    // Forward / backward
    // =========================================================================

    pub(crate) fn forward_train(
        &mut self,
        x: ArrayView2<'_, f32>,
        dropout: f32,
        rng: &mut Xoshiro256PlusPlus,
    ) -> (Array2<f32>, NetCache) {
        let n = x.nrows();
        let mut h = x.to_owned();
        let mut shared_caches = Vec::with_capacity(self.shared.len());
        for block in &mut self.shared {
            let (next, cache) = block.forward_train(h, dropout, rng);
            shared_caches.push(cache);
            h = next;
        }
        let shared_out = h;

        let n_bins = self.n_bins;
        let mut logits = Array2::<f32>::zeros((n, self.topology.n_risks * n_bins));
        let mut head_caches = Vec::with_capacity(self.heads.len());
        let mut head_outs = Vec::with_capacity(self.heads.len());
        for (k, stack) in self.heads.iter_mut().enumerate() {
            let mut hk = shared_out.clone();
            let mut caches = Vec::with_capacity(stack.len());
            for block in stack.iter_mut() {
                let (next, cache) = block.forward_train(hk, dropout, rng);
                caches.push(cache);
                hk = next;
            }
            let out = self.outputs[k].forward(hk.view());
            logits
                .slice_mut(s![.., k * n_bins..(k + 1) * n_bins])
                .assign(&out);
            head_caches.push(caches);
            head_outs.push(hk);
        }

        (
            logits,
            NetCache {
                shared: shared_caches,
                heads: head_caches,
                head_outs,
            },
        )
    }

    pub(crate) fn backward(&mut self, cache: &NetCache, dlogits: Array2<f32>, step: &AdamStep) {
        let n_bins = self.n_bins;
        let mut dshared: Option<Array2<f32>> = None;
        for k in 0..self.heads.len() {
            let dk = dlogits.slice(s![.., k * n_bins..(k + 1) * n_bins]).to_owned();
            let mut g = self.outputs[k].backward(cache.head_outs[k].view(), &dk, step);
            for (block, bc) in self.heads[k].iter_mut().zip(cache.heads[k].iter()).rev() {
                g = block.backward(bc, g, step);
            }
            dshared = Some(match dshared {
                Some(acc) => acc + g,
                None => g,
            });
        }
        let mut g = dshared.expect("at least one risk head");
        for (block, bc) in self.shared.iter_mut().zip(cache.shared.iter()).rev() {
            g = block.backward(bc, g, step);
        }
    }

    fn forward_eval_logits(&self, x: ArrayView2<'_, f32>) -> Array2<f32> {
        let n = x.nrows();
        let mut h = x.to_owned();
        for block in &self.shared {
            h = block.forward_eval(&h);
        }
        let n_bins = self.n_bins;
        let mut logits = Array2::<f32>::zeros((n, self.topology.n_risks * n_bins));
        for (k, stack) in self.heads.iter().enumerate() {
            let mut hk = h.clone();
            for block in stack {
                hk = block.forward_eval(&hk);
            }
            let out = self.outputs[k].forward(hk.view());
            logits
                .slice_mut(s![.., k * n_bins..(k + 1) * n_bins])
                .assign(&out);
        }
        logits
    }

    /// Joint PMF over `(risk, bin)` cells plus the tail cell, in eval mode.
    pub(crate) fn pmf(&self, x: ArrayView2<'_, f32>) -> Array2<f32> {
        softmax_padded(&self.forward_eval_logits(x))
    }

    /// Cause-specific cumulative incidence, `[n_risks, n_bins, n_samples]`.
    pub fn cumulative_incidence(&self, x: ArrayView2<'_, f32>) -> Array3<f32> {
        let pmf = self.pmf(x);
        let n = pmf.nrows();
        let k = self.topology.n_risks;
        let t = self.n_bins;
        let mut cif = Array3::<f32>::zeros((k, t, n));
        for i in 0..n {
            for r in 0..k {
                let mut acc = 0.0f32;
                for s in 0..t {
                    acc += pmf[[i, r * t + s]];
                    cif[[r, s, i]] = acc;
                }
            }
        }
        cif
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn small_topology() -> Topology {
        Topology {
            shared_dims: vec![8],
            risk_dims: vec![4],
            n_risks: 2,
            l2: 0.0,
            batch_norm: false,
        }
    }

    fn inputs(n: usize, d: usize) -> Array2<f32> {
        Array2::from_shape_fn((n, d), |(i, j)| ((i * 7 + j * 3) % 5) as f32 / 5.0)
    }

    #[test]
    fn construction_validates_topology() {
        let bad = Topology {
            n_risks: 0,
            ..small_topology()
        };
        assert!(CauseSpecificNet::new(3, 4, &bad, 0).is_err());
        assert!(CauseSpecificNet::new(3, 4, &small_topology(), 0).is_ok());
    }

    #[test]
    fn same_seed_same_predictions() {
        let x = inputs(6, 3);
        let a = CauseSpecificNet::new(3, 4, &small_topology(), 11).unwrap();
        let b = CauseSpecificNet::new(3, 4, &small_topology(), 11).unwrap();
        let c = CauseSpecificNet::new(3, 4, &small_topology(), 12).unwrap();
        assert_eq!(
            a.cumulative_incidence(x.view()),
            b.cumulative_incidence(x.view())
        );
        assert_ne!(
            a.cumulative_incidence(x.view()),
            c.cumulative_incidence(x.view())
        );
    }

    #[test]
    fn pmf_rows_are_proper_distributions() {
        let net = CauseSpecificNet::new(3, 5, &small_topology(), 3).unwrap();
        let pmf = net.pmf(inputs(4, 3).view());
        assert_eq!(pmf.dim(), (4, 2 * 5 + 1));
        for i in 0..4 {
            let sum: f32 = pmf.row(i).sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn cif_is_monotone_in_bins_for_every_risk_and_subject() {
        let net = CauseSpecificNet::new(3, 6, &small_topology(), 5).unwrap();
        let cif = net.cumulative_incidence(inputs(5, 3).view());
        for r in 0..2 {
            for i in 0..5 {
                for s in 1..6 {
                    assert!(cif[[r, s, i]] >= cif[[r, s - 1, i]]);
                }
            }
        }
    }

    #[test]
    fn batch_norm_variant_runs_both_modes() {
        let topo = Topology {
            batch_norm: true,
            ..small_topology()
        };
        let mut net = CauseSpecificNet::new(3, 4, &topo, 9).unwrap();
        let x = inputs(8, 3);
        let mut rng = rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(1);
        let (logits, _) = net.forward_train(x.view(), 0.2, &mut rng);
        assert_eq!(logits.dim(), (8, 8));
        let cif = net.cumulative_incidence(x.view());
        assert!(cif.iter().all(|v| v.is_finite()));
    }
}
