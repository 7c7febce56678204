//! Grid search over the boosted model's hyperparameters.
//!
//! Every candidate is scored by mean ROC-AUC over stratified folds of one
//! resampled training set. The winner is refit on the whole set and scored
//! once on the test partition.

use indicatif::ProgressBar;
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

use super::config::{AucMode, ParamGrid};
use super::error::{ModelStage, PipelineError};
use super::evaluate::{score_model, ModelEvaluation, TestSet};
use super::metrics::{roc_auc, ClassificationReport, MetricRecord};
use super::models::{Classifier, ModelKind, XgbClassifier, XgbParams};
use super::resample::ResampledSet;

/// Name under which the refit winner is reported
pub const TUNED_MODEL_LABEL: &str = "XGBoost (tuned)";

/// One point of the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct XgbCandidate {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
}

impl XgbCandidate {
    pub fn to_params(&self, scale_pos_weight: f64) -> XgbParams {
        XgbParams {
            n_estimators: self.n_estimators,
            max_depth: self.max_depth,
            learning_rate: self.learning_rate,
            scale_pos_weight,
            ..Default::default()
        }
    }
}

impl std::fmt::Display for XgbCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "learning_rate={}, max_depth={}, n_estimators={}",
            self.learning_rate, self.max_depth, self.n_estimators
        )
    }
}

impl ParamGrid {
    /// Cartesian product in fixed order: learning_rate outermost,
    /// n_estimators innermost.
    pub fn candidates(&self) -> Vec<XgbCandidate> {
        let mut out = Vec::with_capacity(self.len());
        for &learning_rate in &self.learning_rate {
            for &max_depth in &self.max_depth {
                for &n_estimators in &self.n_estimators {
                    out.push(XgbCandidate {
                        n_estimators,
                        max_depth,
                        learning_rate,
                    });
                }
            }
        }
        out
    }
}

/// A single train/validation split
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Unshuffled stratified k-fold.
///
/// Each class's rows, in their original order, are cut into `k` contiguous
/// chunks (earlier chunks one row larger when sizes do not divide evenly);
/// fold `f` validates on chunk `f` of every class.
pub fn stratified_folds(y: &Array1<u8>, k: usize) -> Result<Vec<CvSplit>, PipelineError> {
    if k < 2 {
        return Err(PipelineError::Config {
            reason: format!("cv_folds must be at least 2, got {}", k),
        });
    }

    let mut fold_of = vec![0usize; y.len()];
    for class in [0u8, 1u8] {
        let members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        if members.len() < k {
            return Err(PipelineError::Config {
                reason: format!(
                    "cv_folds = {} exceeds the {} rows of class {}",
                    k,
                    members.len(),
                    class
                ),
            });
        }
        let (base, extra) = (members.len() / k, members.len() % k);
        let mut start = 0;
        for fold in 0..k {
            let size = base + usize::from(fold < extra);
            for &i in &members[start..start + size] {
                fold_of[i] = fold;
            }
            start += size;
        }
    }

    Ok((0..k)
        .map(|fold_idx| {
            let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&i| fold_of[i] == fold_idx);
            CvSplit {
                train_indices,
                test_indices,
                fold_idx,
            }
        })
        .collect())
}

/// Cross-validation outcome of one candidate
#[derive(Debug, Clone, Serialize)]
pub struct CvResult {
    pub params: XgbCandidate,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Winning configuration, refit on the full resampled set
pub struct BestTunedModel {
    pub params: XgbCandidate,
    pub cv_score: f64,
    /// In enumeration order
    pub cv_results: Vec<CvResult>,
    pub model: XgbClassifier,
    pub report: ClassificationReport,
    pub record: MetricRecord,
    pub strategy: String,
}

impl BestTunedModel {
    pub fn kind(&self) -> ModelKind {
        ModelKind::Xgboost
    }
}

/// Mean validation ROC-AUC of one candidate, scored on predicted probabilities
pub fn cross_validate(
    x: &Array2<f64>,
    y: &Array1<u8>,
    folds: &[CvSplit],
    params: &XgbParams,
) -> Result<Vec<f64>, PipelineError> {
    folds
        .iter()
        .map(|split| {
            let train_x = x.select(Axis(0), &split.train_indices);
            let train_y = y.select(Axis(0), &split.train_indices);
            let valid_x = x.select(Axis(0), &split.test_indices);
            let valid_y = y.select(Axis(0), &split.test_indices);

            let mut model = XgbClassifier::new(ModelKind::Xgboost.display_name(), params.clone());
            model.fit(&train_x, &train_y)?;
            let scores = model.predict_proba(&valid_x)?;
            Ok(roc_auc(&valid_y, &scores))
        })
        .collect()
}

/// Exhaustive grid search; ties keep the first candidate in enumeration order.
pub fn tune(
    resampled: &ResampledSet,
    grid: &ParamGrid,
    k_folds: usize,
    scale_pos_weight: f64,
    test: &TestSet<'_>,
    auc_mode: AucMode,
    progress: &ProgressBar,
) -> Result<BestTunedModel, PipelineError> {
    let strategy = resampled.strategy.display_name().to_string();
    let candidates = grid.candidates();
    if candidates.is_empty() {
        return Err(PipelineError::Config {
            reason: "parameter grid has no candidates".to_string(),
        });
    }
    test.check()?;
    let folds = stratified_folds(&resampled.y, k_folds)?;

    progress.set_length(candidates.len() as u64);
    let mut cv_results: Vec<CvResult> = Vec::with_capacity(candidates.len());
    let mut best: Option<usize> = None;
    for candidate in candidates {
        let fold_scores = cross_validate(
            &resampled.x,
            &resampled.y,
            &folds,
            &candidate.to_params(scale_pos_weight),
        )
        .map_err(|e| e.in_model(ModelKind::Xgboost.display_name(), &strategy, ModelStage::Fit))?;
        let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;

        if best.map_or(true, |b: usize| mean_score > cv_results[b].mean_score) {
            best = Some(cv_results.len());
        }
        cv_results.push(CvResult {
            params: candidate,
            fold_scores,
            mean_score,
        });
        progress.inc(1);
    }

    let best_idx = best.unwrap_or(0);
    let params = cv_results[best_idx].params;
    let cv_score = cv_results[best_idx].mean_score;

    let mut model = XgbClassifier::new(
        ModelKind::Xgboost.display_name(),
        params.to_params(scale_pos_weight),
    );
    let ModelEvaluation { mut record, report } =
        score_model(&mut model, resampled, test, auc_mode, &strategy)?;
    record.model = TUNED_MODEL_LABEL.to_string();

    Ok(BestTunedModel {
        params,
        cv_score,
        cv_results,
        model,
        report,
        record,
        strategy,
    })
}
