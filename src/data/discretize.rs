//! Duration discretization onto a fixed per-fold time grid.

use ndarray::ArrayView1;

use super::error::DataError;

/// Discretized `(bin, event)` labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscreteLabels {
    /// Time-bin index per subject, in `0..n_bins`.
    pub bins: Vec<usize>,
    /// Event codes, unchanged by discretization.
    pub events: Vec<u32>,
}

/// Equidistant time grid fitted on training durations.
///
/// The grid is fold-local: it is fitted on the inner-train times of one fold
/// and shared by that fold's fit/predict cycle only. Predicted incidence
/// columns are indexed by this grid, and continuous evaluation times are
/// looked up through [`bin_of`](Self::bin_of).
#[derive(Debug, Clone, PartialEq)]
pub struct DurationGrid {
    cuts: Vec<f64>,
}

impl DurationGrid {
    /// Fit a grid of `n_bins` strictly increasing cut points spanning
    /// `[0, max(times)]`.
    ///
    /// # Errors
    ///
    /// - [`DataError::TooFewBins`] when `n_bins < 2`.
    /// - [`DataError::DegenerateTimeRange`] when the training times have no
    ///   positive maximum (a strictly increasing grid cannot exist).
    pub fn fit(times: ArrayView1<'_, f64>, n_bins: usize) -> Result<Self, DataError> {
        if n_bins < 2 {
            return Err(DataError::TooFewBins(n_bins));
        }
        let t_max = times.iter().cloned().fold(0.0f64, f64::max);
        if !(t_max > 0.0) {
            return Err(DataError::DegenerateTimeRange);
        }
        let step = t_max / (n_bins - 1) as f64;
        let cuts = (0..n_bins).map(|i| i as f64 * step).collect();
        Ok(Self { cuts })
    }

    /// The fitted cut points, strictly increasing, length = configured bins.
    #[inline]
    pub fn cuts(&self) -> &[f64] {
        &self.cuts
    }

    /// Number of time bins.
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.cuts.len()
    }

    /// Bin index for a continuous time: the last cut point at or below `t`,
    /// clamped to the grid.
    #[inline]
    pub fn bin_of(&self, t: f64) -> usize {
        let below = self.cuts.partition_point(|&c| c <= t);
        below.saturating_sub(1).min(self.cuts.len() - 1)
    }

    /// Map `(time, event)` labels onto the grid. Event codes pass through.
    ///
    /// Deterministic: transforming the same labels twice with the same
    /// fitted grid yields identical output.
    pub fn transform(
        &self,
        times: ArrayView1<'_, f64>,
        events: ArrayView1<'_, u32>,
    ) -> DiscreteLabels {
        DiscreteLabels {
            bins: times.iter().map(|&t| self.bin_of(t)).collect(),
            events: events.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rstest::rstest;

    #[test]
    fn fit_produces_strictly_increasing_cuts_of_configured_length() {
        let times = array![1.0, 7.5, 3.0, 10.0];
        let grid = DurationGrid::fit(times.view(), 5).unwrap();
        assert_eq!(grid.n_bins(), 5);
        assert!(grid.cuts().windows(2).all(|w| w[1] > w[0]));
        assert_abs_diff_eq!(grid.cuts()[0], 0.0);
        assert_abs_diff_eq!(grid.cuts()[4], 10.0);
    }

    #[rstest]
    #[case(0.0, 0)]
    #[case(2.4, 0)]
    #[case(2.5, 1)]
    #[case(9.9, 3)]
    #[case(10.0, 4)]
    #[case(50.0, 4)] // beyond the grid
    fn bin_lookup_clamps_to_grid(#[case] t: f64, #[case] expected: usize) {
        let grid = DurationGrid::fit(array![10.0].view(), 5).unwrap(); // cuts 0, 2.5, 5, 7.5, 10
        assert_eq!(grid.bin_of(t), expected);
    }

    #[test]
    fn transform_is_idempotent_and_keeps_events() {
        let times = array![1.0, 4.0, 9.0];
        let events = array![0u32, 1, 2];
        let grid = DurationGrid::fit(array![10.0].view(), 6).unwrap();

        let once = grid.transform(times.view(), events.view());
        let twice = grid.transform(times.view(), events.view());
        assert_eq!(once, twice);
        assert_eq!(once.events, vec![0, 1, 2]);
    }

    #[test]
    fn fit_rejects_degenerate_input() {
        assert!(matches!(
            DurationGrid::fit(array![1.0, 2.0].view(), 1),
            Err(DataError::TooFewBins(1))
        ));
        assert!(matches!(
            DurationGrid::fit(array![0.0, 0.0].view(), 4),
            Err(DataError::DegenerateTimeRange)
        ));
    }
}
