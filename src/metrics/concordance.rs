//! Time-dependent concordance with Kaplan-Meier censoring correction.

use ndarray::{ArrayView1, ArrayView2};

use crate::data::DurationGrid;

use super::km::KaplanMeier;
use super::MetricError;

/// Time-dependent concordance restricted to the primary event.
///
/// `cif_primary` is the predicted primary-event cumulative incidence,
/// `[n_bins, n_samples]`, indexed by the fold's [`DurationGrid`]. A pair
/// `(i, j)` is comparable when subject `i` had the primary event and
/// `T_i < T_j`; it counts as concordant when the model assigns `i` the
/// higher incidence at `T_i` (ties count one half). Pairs are weighted by
/// `1 / G(T_i-)^2` where `G` is the Kaplan-Meier censoring distribution of
/// the cohort; pairs whose weight is undefined (`G = 0`) are dropped.
///
/// # Errors
///
/// [`MetricError::NoComparablePairs`] when no pair qualifies - in
/// particular when the cohort has zero primary events.
pub fn concordance_td(
    times: ArrayView1<'_, f64>,
    events: ArrayView1<'_, u32>,
    cif_primary: ArrayView2<'_, f32>,
    grid: &DurationGrid,
) -> Result<f64, MetricError> {
    let n = times.len();
    let primary: Vec<bool> = events.iter().map(|&e| e == 1).collect();
    let times_vec = times.to_vec();
    let censor_km = KaplanMeier::fit_censoring(&times_vec, &primary);

    let mut numerator = 0.0f64;
    let mut denominator = 0.0f64;
    for i in 0..n {
        if !primary[i] {
            continue;
        }
        let t_i = times[i];
        let g = censor_km.survival_before(t_i);
        if g <= 0.0 {
            continue;
        }
        let weight = 1.0 / (g * g);
        let bin = grid.bin_of(t_i);
        let risk_i = f64::from(cif_primary[[bin, i]]);
        for j in 0..n {
            if times[j] <= t_i {
                continue;
            }
            let risk_j = f64::from(cif_primary[[bin, j]]);
            let score = if risk_i > risk_j {
                1.0
            } else if risk_i == risk_j {
                0.5
            } else {
                0.0
            };
            numerator += weight * score;
            denominator += weight;
        }
    }

    if denominator == 0.0 {
        return Err(MetricError::NoComparablePairs);
    }
    Ok(numerator / denominator)
}
