//! The fold orchestrator: repeated CV, per-fold preprocessing, grid search,
//! prediction export, and per-fold metrics.

use log::{debug, info, warn};
use ndarray::{ArrayView1, ArrayView2, Axis};

use crate::data::{DataError, DiscreteLabels, DurationGrid, StandardScaler, SurvivalDataset};
use crate::io::{FoldPredictions, IoError, PredictionSink};
use crate::metrics::{concordance_td, integrated_brier, MetricError};
use crate::model::{
    CauseSpecificNet, HyperParams, ModelError, ParamError, RiskModel, Topology, TrainControl,
};
use crate::utils::{derive_seed, run_with_threads};

use super::aggregate::{summarize, AggregateError, Summary};
use super::config::{ConfigError, EvalConfig};
use super::grid::SearchGrid;
use super::split::{stratified_holdout, FoldSplit, RepeatedStratifiedKFold};

/// Seed streams for the deterministic per-fold schedule.
const INNER_SPLIT_STREAM: u64 = 1 << 12;
const CANDIDATE_STREAM: u64 = 1 << 13;

// =============================================================================
// Errors
// =============================================================================

/// Abort-level evaluation failures.
///
/// Anything here is a caller mistake detected before the first fold runs;
/// per-fold problems never surface through this type.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("dataset has no subjects")]
    EmptyDataset,
}

/// Recoverable per-fold failures: logged and recorded as omissions.
#[derive(Debug, thiserror::Error)]
enum FoldError {
    #[error("inner split left an empty train or validation set")]
    EmptySplit,

    #[error("no grid candidate produced a usable validation score")]
    NoViableCandidate,

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("prediction export failed: {0}")]
    Export(#[from] IoError),
}

/// Why a single grid candidate was dropped from the search.
#[derive(Debug, thiserror::Error)]
enum CandidateError {
    #[error(transparent)]
    Param(#[from] ParamError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Metric(#[from] MetricError),
}

// =============================================================================
// Outcomes
// =============================================================================

/// Per-fold evaluation result.
///
/// A metric that was undefined for the fold is `None`; both fields are
/// `None` when the fold as a whole was skipped.
#[derive(Debug, Clone)]
pub struct FoldOutcome {
    /// Repeat index in `0..repeats`.
    pub repeat: usize,
    /// Fold index within the repeat.
    pub fold: usize,
    /// Test-set time-dependent concordance, when defined.
    pub concordance: Option<f64>,
    /// Test-set integrated Brier score, when defined.
    pub integrated_brier: Option<f64>,
    /// The grid candidate that won validation selection.
    pub selected: Option<HyperParams>,
}

/// All per-fold outcomes of one evaluation, in (repeat, fold) order.
///
/// The sequence always has length `folds * repeats`; skipped folds appear
/// with absent metrics so positions stay aligned with the split schedule.
#[derive(Debug, Clone)]
pub struct CvReport {
    pub outcomes: Vec<FoldOutcome>,
}

impl CvReport {
    /// Concordance values of the folds where it was defined, in order.
    pub fn concordances(&self) -> Vec<f64> {
        self.outcomes.iter().filter_map(|o| o.concordance).collect()
    }

    /// Integrated Brier values of the folds where it was defined, in order.
    pub fn integrated_briers(&self) -> Vec<f64> {
        self.outcomes
            .iter()
            .filter_map(|o| o.integrated_brier)
            .collect()
    }

    /// Aggregate the concordance sequence.
    ///
    /// # Errors
    ///
    /// [`AggregateError::InsufficientSamples`] with fewer than 2 usable folds.
    pub fn concordance_summary(&self, confidence: f64) -> Result<Summary, AggregateError> {
        summarize(&self.concordances(), confidence)
    }

    /// Aggregate the integrated-Brier sequence.
    ///
    /// # Errors
    ///
    /// [`AggregateError::InsufficientSamples`] with fewer than 2 usable folds.
    pub fn brier_summary(&self, confidence: f64) -> Result<Summary, AggregateError> {
        summarize(&self.integrated_briers(), confidence)
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// The repeated cross-validation evaluation of one model family on one
/// dataset.
#[derive(Debug, Clone)]
pub struct Evaluation {
    config: EvalConfig,
    topology: Topology,
    control: TrainControl,
    grid: SearchGrid,
}

impl Evaluation {
    pub fn new(
        config: EvalConfig,
        topology: Topology,
        control: TrainControl,
        grid: SearchGrid,
    ) -> Self {
        Self {
            config,
            topology,
            control,
            grid,
        }
    }

    /// Run the full evaluation, emitting one prediction table per fold.
    ///
    /// Folds run strictly in (repeat, fold) order; grid candidates within a
    /// fold may run in parallel (the selection reduce stays deterministic
    /// because candidates are reduced in enumeration order). No state
    /// crosses folds except the read-only dataset and the seed schedule.
    ///
    /// # Errors
    ///
    /// [`EvalError`] only for configuration-level problems, detected before
    /// the first fold. Per-fold failures are logged and recorded as absent
    /// metrics in the report.
    pub fn run(
        &self,
        data: &SurvivalDataset,
        sink: &mut dyn PredictionSink,
    ) -> Result<CvReport, EvalError> {
        self.grid.validate()?;
        self.topology.validate().map_err(ConfigError::from)?;
        self.control.validate().map_err(ConfigError::from)?;
        if data.n_samples() == 0 {
            return Err(EvalError::EmptyDataset);
        }

        let key = data.primary_indicator();
        let splits = RepeatedStratifiedKFold::new(
            self.config.folds,
            self.config.repeats,
            self.config.seed,
        )
        .splits(&key);
        let candidates = self.grid.candidates();
        info!(
            "evaluating {} folds ({} x {}) with {} grid candidates",
            splits.len(),
            self.config.folds,
            self.config.repeats,
            candidates.len()
        );

        let mut outcomes = Vec::with_capacity(splits.len());
        for (fold_idx, split) in splits.iter().enumerate() {
            let outcome = match self.run_fold(data, &key, split, fold_idx, &candidates, sink) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("fold {fold_idx} skipped: {err}");
                    FoldOutcome {
                        repeat: split.repeat,
                        fold: split.fold,
                        concordance: None,
                        integrated_brier: None,
                        selected: None,
                    }
                }
            };
            outcomes.push(outcome);
        }
        Ok(CvReport { outcomes })
    }

    /// One outer fold: carve, scale, discretize, search, predict, export,
    /// score.
    fn run_fold(
        &self,
        data: &SurvivalDataset,
        key: &[bool],
        split: &FoldSplit,
        fold_idx: usize,
        candidates: &[HyperParams],
        sink: &mut dyn PredictionSink,
    ) -> Result<FoldOutcome, FoldError> {
        let cfg = &self.config;

        // Inner validation carve, seeded per fold.
        let (train_idx, val_idx) = stratified_holdout(
            &split.train,
            key,
            cfg.validation_fraction,
            derive_seed(cfg.seed, INNER_SPLIT_STREAM + fold_idx as u64),
        );
        if train_idx.is_empty() || val_idx.is_empty() || split.test.is_empty() {
            return Err(FoldError::EmptySplit);
        }

        let mut x_train = data.features_at(&train_idx);
        let mut x_val = data.features_at(&val_idx);
        let mut x_test = data.features_at(&split.test);
        let t_train = data.times_at(&train_idx);
        let e_train = data.events_at(&train_idx);
        let t_val = data.times_at(&val_idx);
        let e_val = data.events_at(&val_idx);
        let t_test = data.times_at(&split.test);
        let e_test = data.events_at(&split.test);

        // Fold-local scaling, fitted on inner-train continuous columns only.
        let scaler = StandardScaler::fit(x_train.view(), data.continuous_range());
        scaler.transform(&mut x_train);
        scaler.transform(&mut x_val);
        scaler.transform(&mut x_test);

        // Fold-local discretization grid, fitted on inner-train labels only.
        // Outer-test labels stay continuous for the final metrics.
        let grid = DurationGrid::fit(t_train.view(), cfg.n_bins)?;
        let lab_train = grid.transform(t_train.view(), e_train.view());
        let lab_val = grid.transform(t_val.view(), e_val.view());

        // Grid search: every candidate trains a fresh predictor from
        // scratch; validation concordance decides.
        let in_dim = data.n_features();
        let candidate_base = derive_seed(cfg.seed, CANDIDATE_STREAM + fold_idx as u64);
        let scored: Vec<Option<(f64, CauseSpecificNet)>> =
            run_with_threads(cfg.n_threads, |parallelism| {
                parallelism.maybe_par_map(
                    candidates.iter().enumerate().collect::<Vec<_>>(),
                    |(ci, hyper)| {
                        let seed = derive_seed(candidate_base, ci as u64);
                        match self.train_candidate(
                            in_dim,
                            &grid,
                            x_train.view(),
                            &lab_train,
                            x_val.view(),
                            &lab_val,
                            t_val.view(),
                            e_val.view(),
                            hyper,
                            seed,
                        ) {
                            Ok(entry) => Some(entry),
                            Err(err) => {
                                debug!("fold {fold_idx} candidate {ci} unusable: {err}");
                                None
                            }
                        }
                    },
                )
            });

        let (best_idx, best_score, best_net) =
            select_best(scored).ok_or(FoldError::NoViableCandidate)?;
        let selected = candidates[best_idx].clone();
        debug!(
            "fold {fold_idx}: candidate {best_idx} selected with validation concordance {best_score:.4}"
        );

        // Predict incidence for every test subject, risk, and bin, and hand
        // the fold table to the export collaborator.
        let cif = best_net.predict_cif(x_test.view());
        sink.write_fold(
            fold_idx,
            &FoldPredictions {
                times: t_test.view(),
                events: e_test.view(),
                cif: &cif,
            },
        )?;

        // Fold metrics on the primary-event curve; undefined values are
        // recorded as absent, not errors.
        let cif_primary = cif.index_axis(Axis(0), 0);
        let concordance = match concordance_td(t_test.view(), e_test.view(), cif_primary, &grid) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("fold {fold_idx}: concordance undefined: {err}");
                None
            }
        };
        let brier = match integrated_brier(t_test.view(), e_test.view(), cif_primary, &grid) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("fold {fold_idx}: calibration integration degenerate: {err}");
                None
            }
        };

        Ok(FoldOutcome {
            repeat: split.repeat,
            fold: split.fold,
            concordance,
            integrated_brier: brier,
            selected: Some(selected),
        })
    }

    /// Train one candidate and score it on the inner validation set.
    #[allow(clippy::too_many_arguments)]
    fn train_candidate(
        &self,
        in_dim: usize,
        grid: &DurationGrid,
        x_train: ArrayView2<'_, f32>,
        lab_train: &DiscreteLabels,
        x_val: ArrayView2<'_, f32>,
        lab_val: &DiscreteLabels,
        t_val: ArrayView1<'_, f64>,
        e_val: ArrayView1<'_, u32>,
        hyper: &HyperParams,
        seed: u64,
    ) -> Result<(f64, CauseSpecificNet), CandidateError> {
        let mut net = CauseSpecificNet::new(in_dim, grid.n_bins(), &self.topology, seed)?;
        let score = fit_and_score(
            &mut net,
            x_train,
            lab_train,
            x_val,
            lab_val,
            t_val,
            e_val,
            grid,
            hyper,
            &self.control,
            seed,
        )?;
        Ok((score, net))
    }
}

/// Fit a predictor through the [`RiskModel`] contract and score it with the
/// validation concordance.
#[allow(clippy::too_many_arguments)]
fn fit_and_score<M: RiskModel>(
    model: &mut M,
    x_train: ArrayView2<'_, f32>,
    lab_train: &DiscreteLabels,
    x_val: ArrayView2<'_, f32>,
    lab_val: &DiscreteLabels,
    t_val: ArrayView1<'_, f64>,
    e_val: ArrayView1<'_, u32>,
    grid: &DurationGrid,
    hyper: &HyperParams,
    control: &TrainControl,
    seed: u64,
) -> Result<f64, CandidateError> {
    model.fit(x_train, lab_train, x_val, lab_val, hyper, control, seed)?;
    let cif = model.predict_cif(x_val);
    let score = concordance_td(t_val, e_val, cif.index_axis(Axis(0), 0), grid)?;
    Ok(score)
}

/// Deterministic max with first-occurrence tie-break.
///
/// Only a strictly greater score displaces the incumbent, so exact ties
/// keep the earliest candidate in enumeration order - the documented
/// selection rule.
fn select_best<T>(scored: Vec<Option<(f64, T)>>) -> Option<(usize, f64, T)> {
    let mut best: Option<(usize, f64, T)> = None;
    for (i, entry) in scored.into_iter().enumerate() {
        if let Some((score, value)) = entry {
            if best.as_ref().map_or(true, |(_, s, _)| score > *s) {
                best = Some((i, score, value));
            }
        }
    }
    best
}
