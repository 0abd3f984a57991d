//! Fold-local standardization of continuous feature columns.

use std::ops::Range;

use ndarray::{Array2, ArrayView2};

/// Mean/variance normalizer for the continuous block of a feature matrix.
///
/// Fitted on the inner-train rows of a fold and applied, with those same
/// parameters, to inner-train, inner-validation, and outer-test. One-hot
/// columns are never touched. A scaler is fold-local: it must not be reused
/// across folds, and `transform` never re-fits.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    range: Range<usize>,
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl StandardScaler {
    /// Fit means and standard deviations over `columns` of `features`.
    ///
    /// `columns` is the continuous block (the trailing columns of the
    /// encoder layout). A constant column gets std 1 so the transform
    /// centers it without amplifying noise.
    pub fn fit(features: ArrayView2<'_, f32>, columns: Range<usize>) -> Self {
        let n = features.nrows().max(1) as f32;
        let mut mean = Vec::with_capacity(columns.len());
        let mut std = Vec::with_capacity(columns.len());
        for c in columns.clone() {
            let col = features.column(c);
            let m = col.sum() / n;
            let var = col.iter().map(|&x| (x - m) * (x - m)).sum::<f32>() / n;
            mean.push(m);
            std.push(if var > 0.0 { var.sqrt() } else { 1.0 });
        }
        Self {
            range: columns,
            mean,
            std,
        }
    }

    /// Apply the fitted transform in place.
    pub fn transform(&self, features: &mut Array2<f32>) {
        for (i, c) in self.range.clone().enumerate() {
            let m = self.mean[i];
            let s = self.std[i];
            features.column_mut(c).mapv_inplace(|x| (x - m) / s);
        }
    }
}
