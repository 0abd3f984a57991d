//! Joint likelihood + ranking loss over the discretized event grid.
//!
//! The network's logits cover `n_risks * n_bins` cells; an implicit
//! zero-logit tail cell absorbs the probability of surviving the whole grid,
//! so the softmax output is a proper joint PMF over (risk, bin) outcomes.

use ndarray::{Array2, Axis};

/// Loss components for one batch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LossValue {
    pub total: f32,
    pub nll: f32,
    pub ranking: f32,
}

/// Softmax over the logits plus the implicit zero-logit tail cell.
///
/// Input `[n_samples, cells]`, output `[n_samples, cells + 1]` with the tail
/// probability in the last column. Rows sum to 1.
pub(crate) fn softmax_padded(logits: &Array2<f32>) -> Array2<f32> {
    let (n, cells) = logits.dim();
    let mut out = Array2::zeros((n, cells + 1));
    for (i, row) in logits.axis_iter(Axis(0)).enumerate() {
        // The tail logit is 0, so the max is taken over {row values, 0}.
        let max = row.iter().cloned().fold(0.0f32, f32::max);
        let mut denom = (-max).exp();
        for &v in row.iter() {
            denom += (v - max).exp();
        }
        for (j, &v) in row.iter().enumerate() {
            out[[i, j]] = (v - max).exp() / denom;
        }
        out[[i, cells]] = (-max).exp() / denom;
    }
    out
}

/// Compute the blended DeepHit-style loss and, optionally, its gradient with
/// respect to the logits.
///
/// - Likelihood term: `-ln pmf[risk][bin]` for an event, `-ln survival(bin)`
///   for a censored subject.
/// - Ranking term: for each risk `k` and each pair `(i, j)` with
///   `event_i = k` and `bin_i < bin_j`, `exp(-(F_i - F_j) / sigma)` where `F`
///   is the risk-`k` CIF at `bin_i`; averaged over pairs, zero when no
///   comparable pairs exist.
///
/// Total = `alpha * nll + (1 - alpha) * ranking`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn loss_and_grad(
    pmf: &Array2<f32>,
    bins: &[usize],
    events: &[u32],
    n_risks: usize,
    n_bins: usize,
    alpha: f32,
    sigma: f32,
    want_grad: bool,
) -> (LossValue, Option<Array2<f32>>) {
    let n = pmf.nrows();
    let cells = n_risks * n_bins;
    let eps = 1e-7f32;

    // --- likelihood term, gradient w.r.t. the padded PMF ---
    let mut dp = Array2::<f32>::zeros((n, cells + 1));
    let mut nll = 0.0f32;
    for i in 0..n {
        let tau = bins[i];
        let e = events[i];
        if e > 0 {
            let c = (e as usize - 1) * n_bins + tau;
            let p = pmf[[i, c]].max(eps);
            nll -= p.ln();
            if want_grad {
                dp[[i, c]] -= 1.0 / p;
            }
        } else {
            let mut s = 1.0f32;
            for r in 0..n_risks {
                for u in 0..=tau {
                    s -= pmf[[i, r * n_bins + u]];
                }
            }
            let s = s.max(eps);
            nll -= s.ln();
            if want_grad {
                let g = 1.0 / s;
                for r in 0..n_risks {
                    for u in 0..=tau {
                        dp[[i, r * n_bins + u]] += g;
                    }
                }
            }
        }
    }
    nll /= n as f32;

    // --- ranking term over the per-sample CIF ---
    let mut cif = vec![0.0f32; n * cells];
    for i in 0..n {
        for r in 0..n_risks {
            let mut acc = 0.0f32;
            for s in 0..n_bins {
                acc += pmf[[i, r * n_bins + s]];
                cif[i * cells + r * n_bins + s] = acc;
            }
        }
    }
    let mut dcif = vec![0.0f32; n * cells];
    let mut rank_sum = 0.0f32;
    let mut pairs = 0usize;
    for i in 0..n {
        let e = events[i];
        if e == 0 {
            continue;
        }
        let r = e as usize - 1;
        let tau = bins[i];
        let fi = cif[i * cells + r * n_bins + tau];
        for j in 0..n {
            if bins[j] <= tau {
                continue;
            }
            let fj = cif[j * cells + r * n_bins + tau];
            let w = (-(fi - fj) / sigma).exp();
            rank_sum += w;
            pairs += 1;
            if want_grad {
                dcif[i * cells + r * n_bins + tau] -= w / sigma;
                dcif[j * cells + r * n_bins + tau] += w / sigma;
            }
        }
    }
    let ranking = if pairs > 0 {
        rank_sum / pairs as f32
    } else {
        0.0
    };

    let value = LossValue {
        total: alpha * nll + (1.0 - alpha) * ranking,
        nll,
        ranking,
    };
    if !want_grad {
        return (value, None);
    }

    // --- assemble gradient w.r.t. the padded PMF ---
    let nll_scale = alpha / n as f32;
    dp.mapv_inplace(|v| v * nll_scale);
    if pairs > 0 {
        // A PMF cell (r, s) feeds every CIF value (r, t >= s): suffix-sum
        // the CIF gradients down to the cells.
        let rank_scale = (1.0 - alpha) / pairs as f32;
        for i in 0..n {
            for r in 0..n_risks {
                let base = i * cells + r * n_bins;
                let mut suffix = 0.0f32;
                for s in (0..n_bins).rev() {
                    suffix += dcif[base + s];
                    if suffix != 0.0 {
                        dp[[i, r * n_bins + s]] += rank_scale * suffix;
                    }
                }
            }
        }
    }

    // --- softmax Jacobian back to the logits (tail logit is fixed at 0) ---
    let mut dz = Array2::<f32>::zeros((n, cells));
    for i in 0..n {
        let mut dot = 0.0f32;
        for c in 0..=cells {
            dot += pmf[[i, c]] * dp[[i, c]];
        }
        for c in 0..cells {
            dz[[i, c]] = pmf[[i, c]] * (dp[[i, c]] - dot);
        }
    }
    (value, Some(dz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn softmax_padded_rows_sum_to_one() {
        let logits = array![[1.0f32, 2.0, -1.0], [0.0, 0.0, 0.0]];
        let pmf = softmax_padded(&logits);
        assert_eq!(pmf.dim(), (2, 4));
        for row in pmf.axis_iter(Axis(0)) {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-6);
            assert!(row.iter().all(|&p| p > 0.0));
        }
        // Zero logits everywhere -> uniform over all 4 cells.
        assert_abs_diff_eq!(pmf[[1, 3]], 0.25, epsilon = 1e-6);
    }

    #[test]
    fn event_nll_matches_cell_probability() {
        // 1 risk, 2 bins; uniform pmf over 3 cells (2 + tail).
        let logits = array![[0.0f32, 0.0]];
        let pmf = softmax_padded(&logits);
        let (value, _) = loss_and_grad(&pmf, &[1], &[1], 1, 2, 1.0, 0.1, false);
        assert_abs_diff_eq!(value.nll, -(1.0f32 / 3.0).ln(), epsilon = 1e-5);
        assert_abs_diff_eq!(value.ranking, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn censored_nll_uses_survival_mass() {
        // Censored at bin 0: survival = 1 - pmf[bin 0] = 2/3 on a uniform pmf.
        let logits = array![[0.0f32, 0.0]];
        let pmf = softmax_padded(&logits);
        let (value, _) = loss_and_grad(&pmf, &[0], &[0], 1, 2, 1.0, 0.1, false);
        assert_abs_diff_eq!(value.nll, -(2.0f32 / 3.0).ln(), epsilon = 1e-5);
    }

    #[test]
    fn ranking_term_prefers_correct_order() {
        // Two subjects, 1 risk, 2 bins. Subject 0 has the event at bin 0,
        // subject 1 survives past it. Concentrating early risk mass on
        // subject 0 must score better than the reverse.
        let good = array![[3.0f32, 0.0], [-3.0, 0.0]];
        let bad = array![[-3.0f32, 0.0], [3.0, 0.0]];
        let bins = [0usize, 1];
        let events = [1u32, 0];

        let (lv_good, _) = loss_and_grad(&softmax_padded(&good), &bins, &events, 1, 2, 0.0, 0.1, false);
        let (lv_bad, _) = loss_and_grad(&softmax_padded(&bad), &bins, &events, 1, 2, 0.0, 0.1, false);
        assert!(lv_good.ranking < lv_bad.ranking);
    }

    #[test]
    fn gradient_matches_finite_differences_on_nll() {
        // Small exact check of the softmax + NLL path.
        let logits = array![[0.3f32, -0.2, 0.5, 0.1]];
        let bins = [1usize];
        let events = [1u32];
        let (_, grad) = loss_and_grad(
            &softmax_padded(&logits),
            &bins,
            &events,
            2,
            2,
            1.0,
            0.1,
            true,
        );
        let grad = grad.unwrap();

        let h = 1e-3f32;
        for c in 0..4 {
            let mut plus = logits.clone();
            plus[[0, c]] += h;
            let mut minus = logits.clone();
            minus[[0, c]] -= h;
            let (lp, _) =
                loss_and_grad(&softmax_padded(&plus), &bins, &events, 2, 2, 1.0, 0.1, false);
            let (lm, _) =
                loss_and_grad(&softmax_padded(&minus), &bins, &events, 2, 2, 1.0, 0.1, false);
            let numeric = (lp.total - lm.total) / (2.0 * h);
            assert_abs_diff_eq!(grad[[0, c]], numeric, epsilon = 1e-2);
        }
    }

    #[test]
    fn no_comparable_pairs_means_zero_ranking() {
        // Both subjects share a bin, so no pair satisfies bin_i < bin_j.
        let logits = array![[0.5f32, 0.5], [0.1, 0.1]];
        let pmf = softmax_padded(&logits);
        let (value, grad) = loss_and_grad(&pmf, &[1, 1], &[1, 1], 1, 2, 0.5, 0.1, true);
        assert_abs_diff_eq!(value.ranking, 0.0, epsilon = 1e-6);
        assert!(grad.is_some());
    }
}
