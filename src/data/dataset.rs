//! The survival dataset container.

use std::ops::Range;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::encoder::OneHotEncoder;
use super::error::DataError;
use super::schema::ColumnSpec;
use super::table::DataTable;

/// Encoded covariates plus `(time, event)` labels for every subject.
///
/// # Storage Layout
///
/// Features are stored sample-major: `[n_samples, n_features]`, one-hot
/// blocks first and the `n_continuous` continuous columns last (the encoder
/// layout). Times are continuous and already clipped to the follow-up
/// horizon; event codes are `0` (censored), `1` (primary event), or
/// `2..=n_risks` (competing events).
///
/// The dataset is read-only during cross-validation: folds address it
/// through index lists and copy out the rows they own.
#[derive(Debug, Clone)]
pub struct SurvivalDataset {
    features: Array2<f32>,
    times: Array1<f64>,
    events: Array1<u32>,
    n_risks: usize,
    n_continuous: usize,
}

impl SurvivalDataset {
    /// Build a dataset from already-encoded parts.
    ///
    /// Times are clipped to `[0, horizon]` when a horizon is given.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] on row-count mismatches, a negative or
    /// non-finite time, or an event code above `n_risks`.
    pub fn new(
        features: Array2<f32>,
        times: Array1<f64>,
        events: Array1<u32>,
        n_risks: usize,
        n_continuous: usize,
        horizon: Option<f64>,
    ) -> Result<Self, DataError> {
        let n = features.nrows();
        if times.len() != n {
            return Err(DataError::ShapeMismatch {
                expected: n,
                got: times.len(),
                field: "times",
            });
        }
        if events.len() != n {
            return Err(DataError::ShapeMismatch {
                expected: n,
                got: events.len(),
                field: "events",
            });
        }
        for (row, &t) in times.iter().enumerate() {
            if !t.is_finite() || t < 0.0 {
                return Err(DataError::InvalidTime { row, value: t });
            }
        }
        for (row, &code) in events.iter().enumerate() {
            if code as usize > n_risks {
                return Err(DataError::InvalidEventCode {
                    row,
                    code,
                    n_risks,
                });
            }
        }
        let times = match horizon {
            Some(h) => times.mapv(|t| t.min(h)),
            None => times,
        };
        Ok(Self {
            features,
            times,
            events,
            n_risks,
            n_continuous,
        })
    }

    /// Encode a raw table and build the dataset in one step.
    ///
    /// The encoder is fitted on the full table (so the feature layout is
    /// shared by every fold) and returned alongside the dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] on schema problems, unparsable numerics, or an
    /// event column containing non-integer codes.
    pub fn from_table(
        table: &DataTable,
        spec: &ColumnSpec,
        time_column: &str,
        event_column: &str,
        n_risks: usize,
        horizon: Option<f64>,
    ) -> Result<(Self, OneHotEncoder), DataError> {
        let encoder = OneHotEncoder::fit(table, spec)?;
        let features = encoder.transform(table)?;
        let times = Array1::from(table.numeric_column(time_column)?);
        let raw_events = table.numeric_column(event_column)?;
        let mut events = Vec::with_capacity(raw_events.len());
        for (row, value) in raw_events.into_iter().enumerate() {
            if value.fract() != 0.0 || value < 0.0 {
                return Err(DataError::InvalidNumeric {
                    column: event_column.to_owned(),
                    row,
                    value: value.to_string(),
                });
            }
            events.push(value as u32);
        }
        let n_continuous = encoder.n_continuous();
        let dataset = Self::new(
            features,
            times,
            Array1::from(events),
            n_risks,
            n_continuous,
            horizon,
        )?;
        Ok((dataset, encoder))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of subjects.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    /// Number of encoded feature columns.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Number of competing risks (event codes run `0..=n_risks`).
    #[inline]
    pub fn n_risks(&self) -> usize {
        self.n_risks
    }

    /// Feature view, `[n_samples, n_features]`.
    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    /// Observed times (clipped to the horizon at construction).
    pub fn times(&self) -> ArrayView1<'_, f64> {
        self.times.view()
    }

    /// Event codes.
    pub fn events(&self) -> ArrayView1<'_, u32> {
        self.events.view()
    }

    /// Column range of the continuous block (the scaler's domain).
    pub fn continuous_range(&self) -> Range<usize> {
        (self.n_features() - self.n_continuous)..self.n_features()
    }

    /// Binary stratification key: `true` where the primary event occurred.
    pub fn primary_indicator(&self) -> Vec<bool> {
        self.events.iter().map(|&e| e == 1).collect()
    }

    // =========================================================================
    // Row selection
    // =========================================================================

    /// Copy out the feature rows at `idx`.
    pub fn features_at(&self, idx: &[usize]) -> Array2<f32> {
        self.features.select(Axis(0), idx)
    }

    /// Copy out the times at `idx`.
    pub fn times_at(&self, idx: &[usize]) -> Array1<f64> {
        Array1::from(idx.iter().map(|&i| self.times[i]).collect::<Vec<_>>())
    }

    /// Copy out the event codes at `idx`.
    pub fn events_at(&self, idx: &[usize]) -> Array1<u32> {
        Array1::from(idx.iter().map(|&i| self.events[i]).collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn features3() -> Array2<f32> {
        array![[1.0f32, 0.5], [0.0, 1.5], [1.0, 2.5]]
    }

    #[test]
    fn new_validates_and_clips() {
        let ds = SurvivalDataset::new(
            features3(),
            array![1.0, 50.0, 3.0],
            array![0u32, 1, 2],
            2,
            1,
            Some(10.0),
        )
        .unwrap();
        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.times().to_vec(), vec![1.0, 10.0, 3.0]);
        assert_eq!(ds.continuous_range(), 1..2);
        assert_eq!(ds.primary_indicator(), vec![false, true, false]);
    }

    #[test]
    fn new_rejects_bad_event_code() {
        let result = SurvivalDataset::new(
            features3(),
            array![1.0, 2.0, 3.0],
            array![0u32, 3, 0],
            2,
            1,
            None,
        );
        assert!(matches!(
            result,
            Err(DataError::InvalidEventCode { row: 1, code: 3, n_risks: 2 })
        ));
    }

    #[test]
    fn new_rejects_negative_time() {
        let result = SurvivalDataset::new(
            features3(),
            array![1.0, -2.0, 3.0],
            array![0u32, 1, 0],
            2,
            1,
            None,
        );
        assert!(matches!(result, Err(DataError::InvalidTime { row: 1, .. })));
    }

    #[test]
    fn row_selection_is_aligned() {
        let ds = SurvivalDataset::new(
            features3(),
            array![1.0, 2.0, 3.0],
            array![0u32, 1, 2],
            2,
            1,
            None,
        )
        .unwrap();
        let idx = [2usize, 0];
        assert_eq!(ds.features_at(&idx).row(0).to_vec(), vec![1.0, 2.5]);
        assert_eq!(ds.times_at(&idx).to_vec(), vec![3.0, 1.0]);
        assert_eq!(ds.events_at(&idx).to_vec(), vec![2, 0]);
    }

    #[test]
    fn from_table_round_trip() {
        let table = DataTable::new(
            vec![
                "sex".into(),
                "age".into(),
                "time".into(),
                "event".into(),
            ],
            vec![
                vec!["m".into(), "f".into(), "m".into()],
                vec!["40".into(), "50".into(), "60".into()],
                vec!["5.0".into(), "2.5".into(), "7.0".into()],
                vec!["0".into(), "1".into(), "2".into()],
            ],
        )
        .unwrap();
        let spec = ColumnSpec {
            categorical: vec!["sex".into()],
            continuous: vec!["age".into()],
        };
        let (ds, enc) =
            SurvivalDataset::from_table(&table, &spec, "time", "event", 2, None).unwrap();
        assert_eq!(ds.n_features(), 3);
        assert_eq!(enc.n_continuous(), 1);
        assert_eq!(ds.events().to_vec(), vec![0, 1, 2]);
    }
}
