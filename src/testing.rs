//! Synthetic competing-risks data for tests and examples.

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::{ColumnSpec, DataTable, SurvivalDataset};

/// Column spec matching [`synthetic_table`]: two categorical columns
/// (3 and 2 levels) and two continuous columns.
pub fn synthetic_column_spec() -> ColumnSpec {
    ColumnSpec {
        categorical: vec!["stage".into(), "treatment".into()],
        continuous: vec!["biomarker".into(), "age".into()],
    }
}

/// Generate a synthetic competing-risks table of `n` subjects.
///
/// Event codes are drawn from `{0, 1, 2}` in fixed 60/30/10 proportions
/// (shuffled with the seeded RNG). Observed times are exponential draws
/// whose rate depends on the covariates, clipped to `[0, 30]`, so a model
/// has real signal to find.
pub fn synthetic_table(n: usize, seed: u64) -> DataTable {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let n_primary = n * 30 / 100;
    let n_competing = n * 10 / 100;
    let mut codes: Vec<u32> = Vec::with_capacity(n);
    codes.extend(std::iter::repeat(1).take(n_primary));
    codes.extend(std::iter::repeat(2).take(n_competing));
    codes.extend(std::iter::repeat(0).take(n - n_primary - n_competing));
    codes.shuffle(&mut rng);

    let stages = ["i", "ii", "iii"];
    let treatments = ["a", "b"];

    let mut stage_col = Vec::with_capacity(n);
    let mut treatment_col = Vec::with_capacity(n);
    let mut biomarker_col = Vec::with_capacity(n);
    let mut age_col = Vec::with_capacity(n);
    let mut time_col = Vec::with_capacity(n);
    let mut event_col = Vec::with_capacity(n);

    for &code in &codes {
        let stage_idx = rng.gen_range(0..stages.len());
        let treatment_idx = rng.gen_range(0..treatments.len());
        let biomarker: f64 = rng.gen::<f64>() * 2.0 - 1.0;
        let age: f64 = 40.0 + rng.gen::<f64>() * 30.0;

        let linear_predictor = 0.8 * biomarker
            + 0.02 * (age - 55.0)
            + [0.0, 0.3, 0.6][stage_idx]
            + [0.0, -0.2][treatment_idx];
        let draw: f64 = rng.gen_range(1e-9..1.0f64);
        let time = (-draw.ln() * 6.0 * (-linear_predictor).exp()).min(30.0);

        stage_col.push(stages[stage_idx].to_string());
        treatment_col.push(treatments[treatment_idx].to_string());
        biomarker_col.push(format!("{biomarker:.6}"));
        age_col.push(format!("{age:.3}"));
        time_col.push(format!("{time:.6}"));
        event_col.push(code.to_string());
    }

    DataTable::new(
        vec![
            "stage".into(),
            "treatment".into(),
            "biomarker".into(),
            "age".into(),
            "time".into(),
            "event".into(),
        ],
        vec![
            stage_col,
            treatment_col,
            biomarker_col,
            age_col,
            time_col,
            event_col,
        ],
    )
    .expect("synthetic columns are aligned")
}

/// Encoded [`SurvivalDataset`] from [`synthetic_table`], two risks.
pub fn synthetic_dataset(n: usize, seed: u64) -> SurvivalDataset {
    let table = synthetic_table(n, seed);
    let (dataset, _) = SurvivalDataset::from_table(
        &table,
        &synthetic_column_spec(),
        "time",
        "event",
        2,
        None,
    )
    .expect("synthetic table is well-formed");
    dataset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_proportions_are_exact_for_round_sizes() {
        let table = synthetic_table(200, 1);
        let events = table.numeric_column("event").unwrap();
        let count = |code: f64| events.iter().filter(|&&e| e == code).count();
        assert_eq!(count(0.0), 120);
        assert_eq!(count(1.0), 60);
        assert_eq!(count(2.0), 20);
    }

    #[test]
    fn same_seed_reproduces_the_table() {
        let a = synthetic_table(50, 9);
        let b = synthetic_table(50, 9);
        assert_eq!(a.column("time").unwrap(), b.column("time").unwrap());
        let c = synthetic_table(50, 10);
        assert_ne!(a.column("time").unwrap(), c.column("time").unwrap());
    }

    #[test]
    fn dataset_has_the_expected_encoded_width() {
        let dataset = synthetic_dataset(100, 5);
        // 3 stage levels + 2 treatment levels + 2 continuous columns.
        assert_eq!(dataset.n_features(), 7);
        assert_eq!(dataset.continuous_range(), 5..7);
        assert_eq!(dataset.n_risks(), 2);
        assert!(dataset.times().iter().all(|&t| (0.0..=30.0).contains(&t)));
    }
}
