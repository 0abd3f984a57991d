//! Repeated stratified K-fold splitting and the inner validation carve.

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::utils::derive_seed;

/// One outer train/test partition.
#[derive(Debug, Clone)]
pub struct FoldSplit {
    /// Repeat index in `0..repeats`.
    pub repeat: usize,
    /// Fold index within the repeat, in `0..folds`.
    pub fold: usize,
    /// Outer training indices, ascending.
    pub train: Vec<usize>,
    /// Outer test indices, ascending.
    pub test: Vec<usize>,
}

/// Repeated stratified K-fold split generator.
///
/// Stratifies on a binary key (here: the primary-event indicator), so every
/// test fold carries its share of primary events. Within one repeat the
/// test sets are pairwise disjoint and their union is the full index set.
/// Each repeat reshuffles with a seed derived from the base seed and the
/// repeat index, so assignments are reproducible regardless of call site or
/// execution order.
#[derive(Debug, Clone)]
pub struct RepeatedStratifiedKFold {
    folds: usize,
    repeats: usize,
    seed: u64,
}

impl RepeatedStratifiedKFold {
    pub fn new(folds: usize, repeats: usize, seed: u64) -> Self {
        Self {
            folds,
            repeats,
            seed,
        }
    }

    /// Generate all `folds * repeats` outer splits, in (repeat, fold) order.
    pub fn splits(&self, key: &[bool]) -> Vec<FoldSplit> {
        let n = key.len();
        let mut out = Vec::with_capacity(self.folds * self.repeats);
        for repeat in 0..self.repeats {
            let mut rng =
                Xoshiro256PlusPlus::seed_from_u64(derive_seed(self.seed, repeat as u64));

            // Shuffle each stratum, then deal it into folds as evenly as
            // possible (the first `n_s % folds` folds get one extra).
            let mut assignment = vec![0usize; n];
            for stratum in [true, false] {
                let mut members: Vec<usize> =
                    (0..n).filter(|&i| key[i] == stratum).collect();
                members.shuffle(&mut rng);
                let base = members.len() / self.folds;
                let extra = members.len() % self.folds;
                let mut cursor = 0usize;
                for fold in 0..self.folds {
                    let take = base + usize::from(fold < extra);
                    for &i in &members[cursor..cursor + take] {
                        assignment[i] = fold;
                    }
                    cursor += take;
                }
            }

            for fold in 0..self.folds {
                let test: Vec<usize> = (0..n).filter(|&i| assignment[i] == fold).collect();
                let train: Vec<usize> = (0..n).filter(|&i| assignment[i] != fold).collect();
                out.push(FoldSplit {
                    repeat,
                    fold,
                    train,
                    test,
                });
            }
        }
        out
    }
}

/// Carve a stratified validation set out of `indices`.
///
/// Returns `(train, validation)`, both ascending. The validation share of
/// each stratum is `round(fraction * stratum size)`. Seeded per fold so
/// different folds get different but reproducible inner splits.
pub fn stratified_holdout(
    indices: &[usize],
    key: &[bool],
    fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut val = Vec::new();
    for stratum in [true, false] {
        let mut members: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| key[i] == stratum)
            .collect();
        members.shuffle(&mut rng);
        let n_val = ((members.len() as f64) * fraction).round() as usize;
        let n_val = n_val.min(members.len());
        val.extend_from_slice(&members[..n_val]);
        train.extend_from_slice(&members[n_val..]);
    }
    train.sort_unstable();
    val.sort_unstable();
    (train, val)
}
