//! CSV table input and per-fold prediction export.

mod export;
mod read;

pub use export::{CsvSink, FoldPredictions, MemorySink, PredictionSink, StoredFold};
pub use read::read_table;

use crate::data::DataError;

/// Errors from reading input tables or writing prediction tables.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Data(#[from] DataError),
}
