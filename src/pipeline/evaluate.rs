//! Evaluation harness: fit every registry model on one resampled set and
//! score it on the untouched test partition.

use ndarray::{Array1, Array2};
use serde::Serialize;

use super::config::AucMode;
use super::dataset::ClassCounts;
use super::error::{ModelStage, PipelineError};
use super::metrics::{ClassificationReport, MetricRecord};
use super::models::{Classifier, ModelKind, ModelRegistry};
use super::resample::ResampledSet;

/// Read-only view of the held-out partition
#[derive(Debug, Clone, Copy)]
pub struct TestSet<'a> {
    pub x: &'a Array2<f64>,
    pub y: &'a Array1<u8>,
}

impl<'a> TestSet<'a> {
    pub fn new(x: &'a Array2<f64>, y: &'a Array1<u8>) -> Self {
        Self { x, y }
    }

    /// Both classes must be present for recall and AUC to mean anything
    pub fn check(&self) -> Result<ClassCounts, PipelineError> {
        if self.x.nrows() != self.y.len() {
            return Err(PipelineError::ShapeMismatch {
                stage: "evaluation",
                expected: format!("{} test labels", self.x.nrows()),
                got: format!("{} test labels", self.y.len()),
            });
        }
        let counts = ClassCounts::from_labels(self.y);
        if !counts.has_both_classes() {
            return Err(PipelineError::SingleClass {
                stage: "test partition",
                present: counts.present_class(),
            });
        }
        Ok(counts)
    }
}

/// Metrics and report of one successfully evaluated model
#[derive(Debug, Clone, Serialize)]
pub struct ModelEvaluation {
    pub record: MetricRecord,
    pub report: ClassificationReport,
}

/// A fitted model kept for importance extraction
pub struct FittedModel {
    pub kind: ModelKind,
    pub model: Box<dyn Classifier>,
}

impl FittedModel {
    pub fn name(&self) -> &str {
        self.model.name()
    }
}

/// Everything one resampling strategy produced
pub struct StrategyEvaluation {
    pub strategy: String,
    /// In registry order, one per model that succeeded
    pub evaluations: Vec<ModelEvaluation>,
    /// Wrapped [`PipelineError::Model`] errors for models that failed
    pub failures: Vec<PipelineError>,
    pub fitted: Vec<FittedModel>,
}

impl StrategyEvaluation {
    pub fn records(&self) -> Vec<&MetricRecord> {
        self.evaluations.iter().map(|e| &e.record).collect()
    }

    pub fn fitted_model(&self, kind: ModelKind) -> Option<&FittedModel> {
        self.fitted.iter().find(|f| f.kind == kind)
    }
}

/// Fit, predict and score every registry model on `resampled`.
///
/// A model that fails is recorded in `failures` and the remaining models
/// still run. Only a test partition lacking a class aborts the whole call.
pub fn evaluate(
    resampled: &ResampledSet,
    registry: &ModelRegistry,
    test: &TestSet<'_>,
    auc_mode: AucMode,
) -> Result<StrategyEvaluation, PipelineError> {
    test.check()?;
    let strategy = resampled.strategy.display_name().to_string();

    let mut evaluation = StrategyEvaluation {
        strategy: strategy.clone(),
        evaluations: Vec::with_capacity(registry.len()),
        failures: Vec::new(),
        fitted: Vec::with_capacity(registry.len()),
    };

    for config in registry.iter() {
        let mut model = config.build();
        match score_model(model.as_mut(), resampled, test, auc_mode, &strategy) {
            Ok(result) => {
                evaluation.evaluations.push(result);
                evaluation.fitted.push(FittedModel {
                    kind: config.kind,
                    model,
                });
            }
            Err(e) => evaluation.failures.push(e),
        }
    }

    Ok(evaluation)
}

/// Run one model through fit, predict and score, tagging failures with their stage
pub fn score_model(
    model: &mut dyn Classifier,
    resampled: &ResampledSet,
    test: &TestSet<'_>,
    auc_mode: AucMode,
    strategy: &str,
) -> Result<ModelEvaluation, PipelineError> {
    let name = model.name().to_string();

    model
        .fit(&resampled.x, &resampled.y)
        .map_err(|e| e.in_model(&name, strategy, ModelStage::Fit))?;

    let probabilities = model
        .predict_proba(test.x)
        .map_err(|e| e.in_model(&name, strategy, ModelStage::Predict))?;
    let predictions = model
        .predict(test.x)
        .map_err(|e| e.in_model(&name, strategy, ModelStage::Predict))?;

    let ranking_scores = match auc_mode {
        AucMode::Labels => predictions.mapv(f64::from),
        AucMode::Scores => probabilities,
    };
    let record = MetricRecord::compute(&name, strategy, test.y, &predictions, &ranking_scores);
    if !record.is_finite() {
        return Err(PipelineError::DegenerateInput {
            reason: "metric computation produced a non-finite value".to_string(),
        }
        .in_model(&name, strategy, ModelStage::Score));
    }

    Ok(ModelEvaluation {
        record,
        report: ClassificationReport::new(test.y, &predictions),
    })
}
