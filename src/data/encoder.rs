//! One-hot encoding of mixed categorical + continuous columns.

use ndarray::Array2;

use super::error::DataError;
use super::schema::{ColumnSpec, FeatureKind};
use super::table::DataTable;

/// Fitted one-hot encoder for a fixed [`ColumnSpec`].
///
/// Fit once on the FULL dataset before any fold split so the vocabulary (and
/// therefore the feature-column order) is identical across folds. A category
/// unseen at fit time encodes to an all-zero indicator block rather than
/// failing - the "unknown" representation.
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    /// Per categorical column: (name, levels in first-appearance order).
    vocab: Vec<(String, Vec<String>)>,
    continuous: Vec<String>,
    n_features: usize,
}

impl OneHotEncoder {
    /// Learn per-column vocabularies from a table.
    ///
    /// Levels are recorded in first-appearance order, which fixes the
    /// one-hot column order for the lifetime of the encoder.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnknownColumn`] if the spec names a column the
    /// table does not have.
    pub fn fit(table: &DataTable, spec: &ColumnSpec) -> Result<Self, DataError> {
        let mut vocab = Vec::with_capacity(spec.categorical.len());
        for name in &spec.categorical {
            let raw = table.column(name)?;
            let mut levels: Vec<String> = Vec::new();
            for value in raw {
                if !levels.iter().any(|l| l == value) {
                    levels.push(value.clone());
                }
            }
            vocab.push((name.clone(), levels));
        }
        for name in &spec.continuous {
            // Fail fast on a bad spec, not at transform time.
            table.column(name)?;
        }
        let n_features = vocab.iter().map(|(_, l)| l.len()).sum::<usize>() + spec.continuous.len();
        Ok(Self {
            vocab,
            continuous: spec.continuous.clone(),
            n_features,
        })
    }

    /// Total encoded feature count.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of trailing continuous columns in the encoded matrix.
    #[inline]
    pub fn n_continuous(&self) -> usize {
        self.continuous.len()
    }

    /// Layout of the encoded matrix, one entry per feature column.
    pub fn feature_kinds(&self) -> Vec<FeatureKind> {
        let mut kinds = Vec::with_capacity(self.n_features);
        for (column, levels) in &self.vocab {
            for level in levels {
                kinds.push(FeatureKind::OneHot {
                    column: column.clone(),
                    level: level.clone(),
                });
            }
        }
        for column in &self.continuous {
            kinds.push(FeatureKind::Continuous {
                column: column.clone(),
            });
        }
        kinds
    }

    /// Encode a table into a `[n_samples, n_features]` matrix.
    ///
    /// One-hot blocks come first (spec order, fitted-vocabulary level order),
    /// then continuous columns. Unknown categorical levels leave their block
    /// all zero.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] on a missing column or an unparsable continuous
    /// cell.
    pub fn transform(&self, table: &DataTable) -> Result<Array2<f32>, DataError> {
        let n_rows = table.n_rows();
        let mut features = Array2::<f32>::zeros((n_rows, self.n_features));

        let mut offset = 0usize;
        for (name, levels) in &self.vocab {
            let raw = table.column(name)?;
            for (row, value) in raw.iter().enumerate() {
                if let Some(pos) = levels.iter().position(|l| l == value) {
                    features[[row, offset + pos]] = 1.0;
                }
            }
            offset += levels.len();
        }
        for name in &self.continuous {
            let values = table.numeric_column(name)?;
            for (row, value) in values.into_iter().enumerate() {
                features[[row, offset]] = value as f32;
            }
            offset += 1;
        }
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ColumnSpec {
        ColumnSpec {
            categorical: vec!["color".into()],
            continuous: vec!["age".into()],
        }
    }

    fn fit_table() -> DataTable {
        DataTable::new(
            vec!["color".into(), "age".into()],
            vec![
                vec!["red".into(), "blue".into(), "red".into()],
                vec!["10".into(), "20".into(), "30".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn vocabulary_order_is_first_appearance() {
        let enc = OneHotEncoder::fit(&fit_table(), &spec()).unwrap();
        let kinds = enc.feature_kinds();
        assert_eq!(enc.n_features(), 3);
        assert_eq!(enc.n_continuous(), 1);
        assert_eq!(
            kinds[0],
            FeatureKind::OneHot {
                column: "color".into(),
                level: "red".into()
            }
        );
        assert_eq!(
            kinds[1],
            FeatureKind::OneHot {
                column: "color".into(),
                level: "blue".into()
            }
        );
        assert_eq!(kinds[2], FeatureKind::Continuous { column: "age".into() });
    }

    #[test]
    fn transform_encodes_one_hot_then_continuous() {
        let enc = OneHotEncoder::fit(&fit_table(), &spec()).unwrap();
        let x = enc.transform(&fit_table()).unwrap();
        assert_eq!(x.shape(), &[3, 3]);
        assert_eq!(x.row(0).to_vec(), vec![1.0, 0.0, 10.0]);
        assert_eq!(x.row(1).to_vec(), vec![0.0, 1.0, 20.0]);
    }

    #[test]
    fn unknown_level_encodes_to_zero_block() {
        let enc = OneHotEncoder::fit(&fit_table(), &spec()).unwrap();
        let other = DataTable::new(
            vec!["color".into(), "age".into()],
            vec![vec!["green".into()], vec!["5".into()]],
        )
        .unwrap();
        let x = enc.transform(&other).unwrap();
        assert_eq!(x.row(0).to_vec(), vec![0.0, 0.0, 5.0]);
    }

    #[test]
    fn missing_column_fails_at_fit() {
        let bad = ColumnSpec {
            categorical: vec!["shape".into()],
            continuous: vec![],
        };
        assert!(matches!(
            OneHotEncoder::fit(&fit_table(), &bad),
            Err(DataError::UnknownColumn(_))
        ));
    }
}
