//! Per-fold prediction tables and the sinks that persist them.

use std::path::PathBuf;

use ndarray::{Array3, ArrayView1};

use super::IoError;

/// One fold's test-set prediction table.
///
/// Rows are test subjects; the table carries the raw observed time, the raw
/// event code, and one cumulative-incidence value per `(risk, bin)` pair.
/// Created fresh per fold and never mutated after write.
#[derive(Debug)]
pub struct FoldPredictions<'a> {
    /// Raw observed times of the test subjects.
    pub times: ArrayView1<'a, f64>,
    /// Raw event codes of the test subjects.
    pub events: ArrayView1<'a, u32>,
    /// Predicted incidence, `[n_risks, n_bins, n_subjects]`.
    pub cif: &'a Array3<f32>,
}

impl FoldPredictions<'_> {
    /// Column header: `time`, `event-code`, then `pred_event{r}_time{t}`
    /// with risks outer and bins inner.
    pub fn header(&self) -> Vec<String> {
        let (n_risks, n_bins, _) = self.cif.dim();
        let mut header = Vec::with_capacity(2 + n_risks * n_bins);
        header.push("time".to_string());
        header.push("event-code".to_string());
        for r in 0..n_risks {
            for t in 0..n_bins {
                header.push(format!("pred_event{}_time{}", r + 1, t));
            }
        }
        header
    }

    /// Number of test subjects.
    pub fn n_rows(&self) -> usize {
        self.times.len()
    }

    /// One row of string cells, matching [`header`](Self::header).
    pub fn row(&self, subject: usize) -> Vec<String> {
        let (n_risks, n_bins, _) = self.cif.dim();
        let mut row = Vec::with_capacity(2 + n_risks * n_bins);
        row.push(self.times[subject].to_string());
        row.push(self.events[subject].to_string());
        for r in 0..n_risks {
            for t in 0..n_bins {
                row.push(self.cif[[r, t, subject]].to_string());
            }
        }
        row
    }
}

// =============================================================================
// PredictionSink
// =============================================================================

/// Destination for per-fold prediction tables.
///
/// Fold indices run over the whole evaluation (`0..folds * repeats`), so a
/// sink sees each index exactly once.
pub trait PredictionSink {
    fn write_fold(&mut self, fold: usize, predictions: &FoldPredictions<'_>)
        -> Result<(), IoError>;
}

/// Writes one `fold_{index}.csv` per fold into a directory.
#[derive(Debug)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    /// Create the sink, making the target directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`] if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, IoError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Deterministic file name for a fold index.
    pub fn fold_path(&self, fold: usize) -> PathBuf {
        self.dir.join(format!("fold_{fold}.csv"))
    }
}

impl PredictionSink for CsvSink {
    fn write_fold(
        &mut self,
        fold: usize,
        predictions: &FoldPredictions<'_>,
    ) -> Result<(), IoError> {
        let mut writer = csv::Writer::from_path(self.fold_path(fold))?;
        writer.write_record(predictions.header())?;
        for subject in 0..predictions.n_rows() {
            writer.write_record(predictions.row(subject))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// In-memory sink for tests and examples.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub folds: Vec<StoredFold>,
}

/// One fold captured by [`MemorySink`].
#[derive(Debug, Clone)]
pub struct StoredFold {
    pub fold: usize,
    pub times: Vec<f64>,
    pub events: Vec<u32>,
    pub cif: Array3<f32>,
}

impl PredictionSink for MemorySink {
    fn write_fold(
        &mut self,
        fold: usize,
        predictions: &FoldPredictions<'_>,
    ) -> Result<(), IoError> {
        self.folds.push(StoredFold {
            fold,
            times: predictions.times.to_vec(),
            events: predictions.events.to_vec(),
            cif: predictions.cif.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    fn sample_predictions() -> (ndarray::Array1<f64>, ndarray::Array1<u32>, Array3<f32>) {
        let times = array![1.5, 3.0];
        let events = array![1u32, 0];
        // 2 risks, 2 bins, 2 subjects.
        let cif = Array3::from_shape_fn((2, 2, 2), |(r, t, s)| {
            (r * 4 + t * 2 + s) as f32 / 10.0
        });
        (times, events, cif)
    }

    #[test]
    fn header_names_follow_the_documented_pattern() {
        let (times, events, cif) = sample_predictions();
        let preds = FoldPredictions {
            times: times.view(),
            events: events.view(),
            cif: &cif,
        };
        assert_eq!(
            preds.header(),
            vec![
                "time",
                "event-code",
                "pred_event1_time0",
                "pred_event1_time1",
                "pred_event2_time0",
                "pred_event2_time1",
            ]
        );
    }

    #[test]
    fn csv_sink_writes_deterministic_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path()).unwrap();
        let (times, events, cif) = sample_predictions();
        let preds = FoldPredictions {
            times: times.view(),
            events: events.view(),
            cif: &cif,
        };
        sink.write_fold(3, &preds).unwrap();

        let path = dir.path().join("fold_3.csv");
        let contents = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3); // header + 2 subjects
        assert!(lines[0].starts_with("time,event-code,pred_event1_time0"));
        assert!(lines[1].starts_with("1.5,1,"));
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let mut sink = MemorySink::default();
        let (times, events, cif) = sample_predictions();
        let preds = FoldPredictions {
            times: times.view(),
            events: events.view(),
            cif: &cif,
        };
        sink.write_fold(0, &preds).unwrap();
        sink.write_fold(1, &preds).unwrap();
        assert_eq!(sink.folds.len(), 2);
        assert_eq!(sink.folds[1].fold, 1);
        assert_eq!(sink.folds[0].times, vec![1.5, 3.0]);
    }
}
