//! Censoring-corrected Brier score, integrated over primary-event times.

use ndarray::{ArrayView1, ArrayView2};

use crate::data::DurationGrid;

use super::km::KaplanMeier;
use super::MetricError;

/// Pointwise censoring-corrected Brier score at time `t`.
///
/// With `S = 1 - CIF_primary`: a subject with a primary event by `t`
/// contributes `S(t)^2 / G(T_i-)`, a subject still under observation past
/// `t` contributes `(1 - S(t))^2 / G(t)`, everyone else contributes
/// nothing. The sum is divided by the cohort size; subjects whose weight is
/// undefined (`G = 0`) are skipped.
fn brier_at(
    t: f64,
    times: ArrayView1<'_, f64>,
    primary: &[bool],
    cif_primary: ArrayView2<'_, f32>,
    grid: &DurationGrid,
    censor_km: &KaplanMeier,
) -> f64 {
    let n = times.len();
    let bin = grid.bin_of(t);
    let g_t = censor_km.survival_at(t);
    let mut total = 0.0f64;
    for i in 0..n {
        let s = 1.0 - f64::from(cif_primary[[bin, i]]);
        if times[i] <= t && primary[i] {
            let g = censor_km.survival_before(times[i]);
            if g > 0.0 {
                total += s * s / g;
            }
        } else if times[i] > t && g_t > 0.0 {
            total += (1.0 - s) * (1.0 - s) / g_t;
        }
    }
    total / n as f64
}

/// Integrated Brier score over the unique primary-event times of the cohort.
///
/// The pointwise score is evaluated at every unique primary-event time,
/// integrated by the trapezoidal rule, and normalized by the time range,
/// yielding a scale-free score.
///
/// # Errors
///
/// [`MetricError::DegenerateTimeGrid`] when the cohort has fewer than 2
/// unique primary-event times - the integral is undefined there and must be
/// reported, never silently produced as NaN.
pub fn integrated_brier(
    times: ArrayView1<'_, f64>,
    events: ArrayView1<'_, u32>,
    cif_primary: ArrayView2<'_, f32>,
    grid: &DurationGrid,
) -> Result<f64, MetricError> {
    let primary: Vec<bool> = events.iter().map(|&e| e == 1).collect();

    let mut event_times: Vec<f64> = times
        .iter()
        .zip(&primary)
        .filter(|(_, &p)| p)
        .map(|(&t, _)| t)
        .collect();
    event_times.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    event_times.dedup();
    if event_times.len() < 2 {
        return Err(MetricError::DegenerateTimeGrid(event_times.len()));
    }

    let times_vec = times.to_vec();
    let censor_km = KaplanMeier::fit_censoring(&times_vec, &primary);
    let scores: Vec<f64> = event_times
        .iter()
        .map(|&t| brier_at(t, times, &primary, cif_primary, grid, &censor_km))
        .collect();

    let mut integral = 0.0f64;
    for w in event_times.windows(2).zip(scores.windows(2)) {
        let (ts, bs) = w;
        integral += (bs[0] + bs[1]) / 2.0 * (ts[1] - ts[0]);
    }
    let range = event_times[event_times.len() - 1] - event_times[0];
    Ok(integral / range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn grid10() -> DurationGrid {
        DurationGrid::fit(array![10.0].view(), 5).unwrap()
    }

    #[test]
    fn perfect_step_predictions_score_zero() {
        // Events exactly on the grid cuts; each subject's predicted
        // incidence jumps to 1 at its own event time.
        let times = array![2.5, 5.0, 7.5];
        let events = array![1u32, 1, 1];
        let grid = grid10();
        let cif = Array2::from_shape_fn((5, 3), |(b, i)| {
            if grid.cuts()[b] >= times[i] {
                1.0
            } else {
                0.0
            }
        });
        let ibs = integrated_brier(times.view(), events.view(), cif.view(), &grid).unwrap();
        assert_abs_diff_eq!(ibs, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn coin_flip_predictions_score_a_quarter() {
        // Constant 0.5 incidence, no censoring: every subject contributes
        // 0.25 at every evaluation time.
        let times = array![2.5, 5.0, 7.5, 9.0];
        let events = array![1u32, 1, 1, 1];
        let cif = Array2::from_elem((5, 4), 0.5f32);
        let ibs = integrated_brier(times.view(), events.view(), cif.view(), &grid10()).unwrap();
        assert_abs_diff_eq!(ibs, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn fewer_than_two_unique_primary_times_is_degenerate() {
        let times = array![2.5, 5.0, 5.0];
        let events = array![0u32, 1, 1];
        let cif = Array2::from_elem((5, 3), 0.5f32);
        assert_eq!(
            integrated_brier(times.view(), events.view(), cif.view(), &grid10()),
            Err(MetricError::DegenerateTimeGrid(1))
        );

        let no_events = array![0u32, 0, 2];
        assert_eq!(
            integrated_brier(times.view(), no_events.view(), cif.view(), &grid10()),
            Err(MetricError::DegenerateTimeGrid(0))
        );
    }
}
