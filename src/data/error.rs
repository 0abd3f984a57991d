//! Data validation errors.

/// Errors raised while constructing or transforming datasets.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// Table has no rows or no columns.
    #[error("table is empty")]
    EmptyTable,

    /// A named column does not exist in the table.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// Mismatched lengths between row-aligned arrays.
    #[error("{field} length mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        expected: usize,
        got: usize,
        field: &'static str,
    },

    /// A cell could not be parsed as a number.
    #[error("column '{column}' row {row}: cannot parse '{value}' as a number")]
    InvalidNumeric {
        column: String,
        row: usize,
        value: String,
    },

    /// Event code outside `{0, 1, .., n_risks}`.
    #[error("row {row}: event code {code} outside 0..={n_risks}")]
    InvalidEventCode {
        row: usize,
        code: u32,
        n_risks: usize,
    },

    /// Observed time negative or non-finite.
    #[error("row {row}: observed time {value} is not a non-negative finite number")]
    InvalidTime { row: usize, value: f64 },

    /// Discretization grid needs at least 2 bins.
    #[error("discretization needs at least 2 bins, got {0}")]
    TooFewBins(usize),

    /// Training times span a zero range; no strictly increasing grid exists.
    #[error("cannot fit a discretization grid on a zero time range")]
    DegenerateTimeRange,
}
