//! Typed hyperparameter grid with deterministic enumeration order.

use itertools::iproduct;
use serde::Deserialize;

use crate::model::HyperParams;

use super::config::ConfigError;

/// Candidate lists for every searched hyperparameter.
///
/// [`candidates`](Self::candidates) enumerates the full Cartesian product -
/// no pruning - in a fixed, documented order: learning rate outermost, then
/// alpha, sigma, dropout, and batch size innermost. Selection keeps the
/// strictly best validation score, so exact ties resolve to the first
/// candidate in this order; preserving that order is what makes the search
/// reproducible.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchGrid {
    pub learning_rates: Vec<f32>,
    pub alphas: Vec<f32>,
    pub sigmas: Vec<f32>,
    pub dropouts: Vec<f32>,
    pub batch_sizes: Vec<usize>,
}

impl Default for SearchGrid {
    /// A single-point grid at the [`HyperParams`] defaults.
    fn default() -> Self {
        let d = HyperParams::default();
        Self {
            learning_rates: vec![d.learning_rate],
            alphas: vec![d.alpha],
            sigmas: vec![d.sigma],
            dropouts: vec![d.dropout],
            batch_sizes: vec![d.batch_size],
        }
    }
}

impl SearchGrid {
    /// Validate the grid: every axis non-empty, every candidate in range.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyGrid`] for an empty axis - an empty grid is a
    /// caller mistake and aborts before any fold runs - or the underlying
    /// parameter error for an out-of-range candidate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.learning_rates.is_empty() {
            return Err(ConfigError::EmptyGrid {
                axis: "learning_rates",
            });
        }
        if self.alphas.is_empty() {
            return Err(ConfigError::EmptyGrid { axis: "alphas" });
        }
        if self.sigmas.is_empty() {
            return Err(ConfigError::EmptyGrid { axis: "sigmas" });
        }
        if self.dropouts.is_empty() {
            return Err(ConfigError::EmptyGrid { axis: "dropouts" });
        }
        if self.batch_sizes.is_empty() {
            return Err(ConfigError::EmptyGrid { axis: "batch_sizes" });
        }
        for candidate in self.candidates() {
            candidate.validate()?;
        }
        Ok(())
    }

    /// Number of candidates in the product.
    pub fn len(&self) -> usize {
        self.learning_rates.len()
            * self.alphas.len()
            * self.sigmas.len()
            * self.dropouts.len()
            * self.batch_sizes.len()
    }

    /// Whether the product is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerate the full Cartesian product in the documented order.
    pub fn candidates(&self) -> Vec<HyperParams> {
        iproduct!(
            &self.learning_rates,
            &self.alphas,
            &self.sigmas,
            &self.dropouts,
            &self.batch_sizes
        )
        .map(
            |(&learning_rate, &alpha, &sigma, &dropout, &batch_size)| HyperParams {
                learning_rate,
                alpha,
                sigma,
                dropout,
                batch_size,
            },
        )
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_is_a_single_point() {
        let grid = SearchGrid::default();
        assert!(grid.validate().is_ok());
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.candidates(), vec![HyperParams::default()]);
    }

    #[test]
    fn two_by_two_grid_has_four_candidates_in_documented_order() {
        let grid = SearchGrid {
            learning_rates: vec![0.01, 0.1],
            alphas: vec![0.2, 0.8],
            ..Default::default()
        };
        let candidates = grid.candidates();
        assert_eq!(candidates.len(), 4);
        // Learning rate outermost, alpha next.
        let pairs: Vec<(f32, f32)> = candidates
            .iter()
            .map(|c| (c.learning_rate, c.alpha))
            .collect();
        assert_eq!(pairs, vec![(0.01, 0.2), (0.01, 0.8), (0.1, 0.2), (0.1, 0.8)]);
    }

    #[test]
    fn empty_axis_is_a_config_error() {
        let grid = SearchGrid {
            sigmas: vec![],
            ..Default::default()
        };
        assert_eq!(
            grid.validate(),
            Err(ConfigError::EmptyGrid { axis: "sigmas" })
        );
        assert!(grid.is_empty());
    }

    #[test]
    fn out_of_range_candidate_is_rejected() {
        let grid = SearchGrid {
            dropouts: vec![0.1, 1.0],
            ..Default::default()
        };
        assert!(matches!(grid.validate(), Err(ConfigError::Param(_))));
    }
}
