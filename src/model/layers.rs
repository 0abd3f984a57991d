//! Trainable layer primitives: dense, batch-norm, dropout, Adam state.

use ndarray::{Array, Array1, Array2, ArrayView2, Axis, Dimension, Ix1, Ix2, Zip};
use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const ADAM_EPS: f32 = 1e-8;

/// One Adam update step, shared by every parameter in the batch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AdamStep {
    pub lr: f32,
    pub l2: f32,
    /// 1-based step counter for bias correction.
    pub t: i32,
}

/// A trainable tensor with its Adam moment buffers.
#[derive(Debug, Clone)]
pub(crate) struct Param<D: Dimension> {
    pub value: Array<f32, D>,
    m: Array<f32, D>,
    v: Array<f32, D>,
}

impl<D: Dimension> Param<D> {
    pub fn new(value: Array<f32, D>) -> Self {
        let m = Array::zeros(value.raw_dim());
        let v = Array::zeros(value.raw_dim());
        Self { value, m, v }
    }

    /// Apply one Adam step with L2 penalty folded into the gradient.
    pub fn update(&mut self, grad: &Array<f32, D>, step: &AdamStep) {
        let bc1 = 1.0 - BETA1.powi(step.t);
        let bc2 = 1.0 - BETA2.powi(step.t);
        Zip::from(&mut self.value)
            .and(&mut self.m)
            .and(&mut self.v)
            .and(grad)
            .for_each(|w, m, v, &g| {
                let g = g + step.l2 * *w;
                *m = BETA1 * *m + (1.0 - BETA1) * g;
                *v = BETA2 * *v + (1.0 - BETA2) * g * g;
                *w -= step.lr * (*m / bc1) / ((*v / bc2).sqrt() + ADAM_EPS);
            });
    }
}

// =============================================================================
// Dense
// =============================================================================

/// Fully connected layer, `[in_dim] -> [out_dim]`.
#[derive(Debug, Clone)]
pub(crate) struct Dense {
    pub w: Param<Ix2>,
    pub b: Param<Ix1>,
}

impl Dense {
    /// Uniform init in `±1/sqrt(in_dim)`, drawn from the caller's RNG.
    pub fn new(in_dim: usize, out_dim: usize, rng: &mut Xoshiro256PlusPlus) -> Self {
        let bound = 1.0 / (in_dim as f32).sqrt();
        let w = Array2::from_shape_fn((in_dim, out_dim), |_| rng.gen_range(-bound..bound));
        let b = Array1::from_shape_fn(out_dim, |_| rng.gen_range(-bound..bound));
        Self {
            w: Param::new(w),
            b: Param::new(b),
        }
    }

    pub fn forward(&self, x: ArrayView2<'_, f32>) -> Array2<f32> {
        let mut z = x.dot(&self.w.value);
        z += &self.b.value;
        z
    }

    /// Backpropagate and update in place; returns the gradient w.r.t. input.
    pub fn backward(
        &mut self,
        x: ArrayView2<'_, f32>,
        grad_out: &Array2<f32>,
        step: &AdamStep,
    ) -> Array2<f32> {
        let dw = x.t().dot(grad_out);
        let db = grad_out.sum_axis(Axis(0));
        let dx = grad_out.dot(&self.w.value.t());
        self.w.update(&dw, step);
        self.b.update(&db, step);
        dx
    }
}

// =============================================================================
// BatchNorm
// =============================================================================

/// Batch normalization over the sample axis, with running statistics for
/// inference.
#[derive(Debug, Clone)]
pub(crate) struct BatchNorm {
    pub gamma: Param<Ix1>,
    pub beta: Param<Ix1>,
    running_mean: Array1<f32>,
    running_var: Array1<f32>,
    momentum: f32,
    eps: f32,
}

/// Per-batch values the backward pass needs.
#[derive(Debug, Clone)]
pub(crate) struct BatchNormCache {
    xhat: Array2<f32>,
    inv_std: Array1<f32>,
}

impl BatchNorm {
    pub fn new(dim: usize) -> Self {
        Self {
            gamma: Param::new(Array1::ones(dim)),
            beta: Param::new(Array1::zeros(dim)),
            running_mean: Array1::zeros(dim),
            running_var: Array1::ones(dim),
            momentum: 0.1,
            eps: 1e-5,
        }
    }

    pub fn forward_train(&mut self, x: &Array2<f32>) -> (Array2<f32>, BatchNormCache) {
        let mean = x.mean_axis(Axis(0)).expect("non-empty batch");
        let var = x.var_axis(Axis(0), 0.0);
        let inv_std = var.mapv(|v| 1.0 / (v + self.eps).sqrt());
        let xhat = (x - &mean) * &inv_std;
        let y = &xhat * &self.gamma.value + &self.beta.value;

        self.running_mean = &self.running_mean * (1.0 - self.momentum) + &mean * self.momentum;
        self.running_var = &self.running_var * (1.0 - self.momentum) + &var * self.momentum;

        (y, BatchNormCache { xhat, inv_std })
    }

    pub fn forward_eval(&self, x: &Array2<f32>) -> Array2<f32> {
        let inv_std = self.running_var.mapv(|v| 1.0 / (v + self.eps).sqrt());
        (x - &self.running_mean) * &inv_std * &self.gamma.value + &self.beta.value
    }

    pub fn backward(
        &mut self,
        cache: &BatchNormCache,
        grad_out: &Array2<f32>,
        step: &AdamStep,
    ) -> Array2<f32> {
        let dgamma = (grad_out * &cache.xhat).sum_axis(Axis(0));
        let dbeta = grad_out.sum_axis(Axis(0));

        let dxhat = grad_out * &self.gamma.value;
        let mean_dxhat = dxhat.mean_axis(Axis(0)).expect("non-empty batch");
        let mean_dxhat_xhat = (&dxhat * &cache.xhat)
            .mean_axis(Axis(0))
            .expect("non-empty batch");
        let dx = (dxhat - &mean_dxhat - &cache.xhat * &mean_dxhat_xhat) * &cache.inv_std;

        self.gamma.update(&dgamma, step);
        self.beta.update(&dbeta, step);
        dx
    }
}

// =============================================================================
// Dropout
// =============================================================================

/// Inverted dropout mask: kept units are scaled by `1/(1-rate)` so the
/// expected activation is unchanged.
pub(crate) fn dropout_mask(
    shape: (usize, usize),
    rate: f32,
    rng: &mut Xoshiro256PlusPlus,
) -> Array2<f32> {
    let keep = 1.0 - rate;
    Array2::from_shape_fn(shape, |_| {
        if rng.gen::<f32>() < keep {
            1.0 / keep
        } else {
            0.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn dense_forward_matches_manual() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mut layer = Dense::new(2, 1, &mut rng);
        layer.w.value = array![[2.0], [3.0]];
        layer.b.value = array![0.5];

        let x = array![[1.0f32, 1.0], [0.0, 2.0]];
        let z = layer.forward(x.view());
        assert_abs_diff_eq!(z[[0, 0]], 5.5, epsilon = 1e-6);
        assert_abs_diff_eq!(z[[1, 0]], 6.5, epsilon = 1e-6);
    }

    #[test]
    fn adam_step_descends_a_quadratic() {
        // Minimize (w - 3)^2 via its gradient 2(w - 3).
        let mut p = Param::new(array![0.0f32]);
        for t in 1..=500 {
            let grad = array![2.0 * (p.value[0] - 3.0)];
            p.update(
                &grad,
                &AdamStep {
                    lr: 0.05,
                    l2: 0.0,
                    t,
                },
            );
        }
        assert_abs_diff_eq!(p.value[0], 3.0, epsilon = 0.05);
    }

    #[test]
    fn batch_norm_train_output_is_standardized() {
        let mut bn = BatchNorm::new(1);
        let x = array![[1.0f32], [2.0], [3.0], [4.0]];
        let (y, _) = bn.forward_train(&x);
        let mean = y.mean_axis(Axis(0)).unwrap()[0];
        let var = y.var_axis(Axis(0), 0.0)[0];
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(var, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn dropout_mask_is_zero_or_scaled() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mask = dropout_mask((8, 8), 0.5, &mut rng);
        for &v in mask.iter() {
            assert!(v == 0.0 || (v - 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn zero_rate_dropout_keeps_everything() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mask = dropout_mask((4, 4), 0.0, &mut rng);
        assert!(mask.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }
}
