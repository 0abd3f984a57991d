//! Dataset containers and per-fold preprocessing.
//!
//! The types here split along fold boundaries:
//!
//! - Fitted once on the FULL dataset, before any split: [`OneHotEncoder`]
//!   (so unseen categories at test time map to an all-zero block instead of
//!   failing), and the [`SurvivalDataset`] container itself.
//! - Fitted per fold, on the inner-train split only: [`StandardScaler`] and
//!   [`DurationGrid`]. Neither may leak validation or test information, and
//!   neither is ever reused across folds.

mod dataset;
mod discretize;
mod encoder;
mod error;
mod scaler;
mod schema;
mod table;

pub use dataset::SurvivalDataset;
pub use discretize::{DiscreteLabels, DurationGrid};
pub use encoder::OneHotEncoder;
pub use error::DataError;
pub use scaler::StandardScaler;
pub use schema::{ColumnSpec, FeatureKind};
pub use table::DataTable;
