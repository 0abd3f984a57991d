//! Column specification and encoded-feature layout.

use serde::Deserialize;

/// Names of the raw table columns used as model inputs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSpec {
    /// Categorical covariate columns, one-hot encoded.
    pub categorical: Vec<String>,
    /// Continuous covariate columns, passed through (and scaled per fold).
    pub continuous: Vec<String>,
}

impl ColumnSpec {
    /// Number of raw covariate columns.
    pub fn n_raw(&self) -> usize {
        self.categorical.len() + self.continuous.len()
    }
}

/// One column of the encoded feature matrix.
///
/// The encoder emits all one-hot blocks first (in `ColumnSpec` order, levels
/// in fitted-vocabulary order), then the continuous columns. This order is
/// fixed by the fitted encoder and shared by every fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureKind {
    /// Indicator for one level of a categorical column.
    OneHot { column: String, level: String },
    /// A continuous column, passed through.
    Continuous { column: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_raw_counts_both_groups() {
        let spec = ColumnSpec {
            categorical: vec!["a".into(), "b".into()],
            continuous: vec!["x".into()],
        };
        assert_eq!(spec.n_raw(), 3);
    }
}
