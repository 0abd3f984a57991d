//! Columnar container for raw tabular input.

use super::error::DataError;

/// A table of named string columns, row-aligned.
///
/// This is the crate's only assumption about input data: tabular, with named
/// columns. Values stay as strings until a consumer asks for a typed view,
/// so categorical levels keep their exact spelling.
#[derive(Debug, Clone)]
pub struct DataTable {
    headers: Vec<String>,
    columns: Vec<Vec<String>>,
}

impl DataTable {
    /// Create a table from headers and column-major data.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] if the table is empty or columns have uneven
    /// lengths.
    pub fn new(headers: Vec<String>, columns: Vec<Vec<String>>) -> Result<Self, DataError> {
        if headers.is_empty() || columns.is_empty() {
            return Err(DataError::EmptyTable);
        }
        if headers.len() != columns.len() {
            return Err(DataError::ShapeMismatch {
                expected: headers.len(),
                got: columns.len(),
                field: "columns",
            });
        }
        let n_rows = columns[0].len();
        if n_rows == 0 {
            return Err(DataError::EmptyTable);
        }
        for col in &columns {
            if col.len() != n_rows {
                return Err(DataError::ShapeMismatch {
                    expected: n_rows,
                    got: col.len(),
                    field: "column rows",
                });
            }
        }
        Ok(Self { headers, columns })
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.columns[0].len()
    }

    /// Column headers, in table order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Get a column by name.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnknownColumn`] if the name is absent.
    pub fn column(&self, name: &str) -> Result<&[String], DataError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| DataError::UnknownColumn(name.to_owned()))
    }

    /// Get a column parsed as `f64`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::UnknownColumn`] or [`DataError::InvalidNumeric`].
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let raw = self.column(name)?;
        raw.iter()
            .enumerate()
            .map(|(row, value)| {
                value.trim().parse::<f64>().map_err(|_| DataError::InvalidNumeric {
                    column: name.to_owned(),
                    row,
                    value: value.clone(),
                })
            })
            .collect()
    }
}
