//! Classifier registry.
//!
//! Every model implements [`Classifier`]; the evaluation harness and the
//! tuner only ever talk to `Box<dyn Classifier>`. [`ModelRegistry::standard`]
//! builds the fixed five-model line-up in a stable order.

mod forest;
mod gbm;
mod logistic;
mod tree;
mod xgboost;

pub use forest::{ForestParams, RandomForestClassifier};
pub use gbm::{GbmParams, GradientBoostingClassifier};
pub use logistic::{LogisticParams, LogisticRegression};
pub use tree::{Criterion, DecisionTreeClassifier, MaxFeatures, Tree, TreeParams};
pub use xgboost::{XgbClassifier, XgbParams};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::dataset::ClassCounts;
use super::error::PipelineError;

/// Probability above which a row is predicted positive
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Binary classifier capability shared by all registry entries
pub trait Classifier: Send + Sync {
    /// Display name, e.g. "Random Forest"
    fn name(&self) -> &str;

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<u8>) -> Result<(), PipelineError>;

    /// Positive-class probability per row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, PipelineError>;

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<u8>, PipelineError> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| u8::from(p > DECISION_THRESHOLD)))
    }

    /// Per-feature importance scores summing to 1.0 (all zero when no split
    /// was made). `None` for models without a native importance measure or
    /// before fitting.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

/// How training rows are weighted by class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    #[default]
    None,
    /// Each class weighted by `n / (2 * n_class)`
    Balanced,
}

impl ClassWeight {
    /// Per-row sample weights for `y`
    pub fn sample_weights(&self, y: &Array1<u8>) -> Vec<f64> {
        match self {
            ClassWeight::None => vec![1.0; y.len()],
            ClassWeight::Balanced => {
                let counts = ClassCounts::from_labels(y);
                let n = y.len() as f64;
                let w_pos = if counts.positive > 0 {
                    n / (2.0 * counts.positive as f64)
                } else {
                    0.0
                };
                let w_neg = if counts.negative > 0 {
                    n / (2.0 * counts.negative as f64)
                } else {
                    0.0
                };
                y.iter().map(|&v| if v == 1 { w_pos } else { w_neg }).collect()
            }
        }
    }
}

/// Ratio of negative to positive labels, the boosted model's imbalance weight.
/// Returns 1.0 when there are no positives.
pub fn scale_pos_weight(labels: &Array1<u8>) -> f64 {
    let counts = ClassCounts::from_labels(labels);
    if counts.positive == 0 {
        1.0
    } else {
        counts.negative as f64 / counts.positive as f64
    }
}

/// The five model families in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
    DecisionTree,
    RandomForest,
    GradientBoosting,
    Xgboost,
}

impl ModelKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::RandomForest => "Random Forest",
            ModelKind::GradientBoosting => "Gradient Boosting",
            ModelKind::Xgboost => "XGBoost",
        }
    }

    /// Whether fitted models of this kind expose feature importances
    pub fn has_importances(&self) -> bool {
        matches!(
            self,
            ModelKind::RandomForest | ModelKind::GradientBoosting | ModelKind::Xgboost
        )
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Hyperparameters of one registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ModelParams {
    Logistic(LogisticParams),
    Tree(TreeParams),
    Forest(ForestParams),
    Gbm(GbmParams),
    Xgb(XgbParams),
}

/// Named classifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub kind: ModelKind,
    pub params: ModelParams,
}

impl ModelConfig {
    pub fn name(&self) -> &'static str {
        self.kind.display_name()
    }

    /// Fresh, unfitted classifier for this configuration
    pub fn build(&self) -> Box<dyn Classifier> {
        let name = self.kind.display_name();
        match &self.params {
            ModelParams::Logistic(p) => Box::new(LogisticRegression::new(name, p.clone())),
            ModelParams::Tree(p) => Box::new(DecisionTreeClassifier::new(name, p.clone())),
            ModelParams::Forest(p) => Box::new(RandomForestClassifier::new(name, p.clone())),
            ModelParams::Gbm(p) => Box::new(GradientBoostingClassifier::new(name, p.clone())),
            ModelParams::Xgb(p) => Box::new(XgbClassifier::new(name, p.clone())),
        }
    }
}

/// Ordered set of model configurations evaluated per resampling strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRegistry {
    pub models: Vec<ModelConfig>,
}

impl ModelRegistry {
    /// Logistic regression, decision tree and random forest with balanced
    /// class weights; gradient boosting with defaults; the regularized booster
    /// with `scale_pos_weight`.
    pub fn standard(scale_pos_weight: f64, seed: u64) -> Self {
        let models = vec![
            ModelConfig {
                kind: ModelKind::LogisticRegression,
                params: ModelParams::Logistic(LogisticParams {
                    class_weight: ClassWeight::Balanced,
                    ..Default::default()
                }),
            },
            ModelConfig {
                kind: ModelKind::DecisionTree,
                params: ModelParams::Tree(TreeParams {
                    class_weight: ClassWeight::Balanced,
                    seed,
                    ..Default::default()
                }),
            },
            ModelConfig {
                kind: ModelKind::RandomForest,
                params: ModelParams::Forest(ForestParams {
                    class_weight: ClassWeight::Balanced,
                    seed,
                    ..Default::default()
                }),
            },
            ModelConfig {
                kind: ModelKind::GradientBoosting,
                params: ModelParams::Gbm(GbmParams {
                    seed,
                    ..Default::default()
                }),
            },
            ModelConfig {
                kind: ModelKind::Xgboost,
                params: ModelParams::Xgb(XgbParams {
                    scale_pos_weight,
                    ..Default::default()
                }),
            },
        ];
        Self { models }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelConfig> {
        self.models.iter()
    }
}

/// Validate a training pair and return its class counts.
/// Both classes must be present.
pub(crate) fn check_training(
    x: &Array2<f64>,
    y: &Array1<u8>,
) -> Result<ClassCounts, PipelineError> {
    if x.nrows() != y.len() {
        return Err(PipelineError::ShapeMismatch {
            stage: "fit",
            expected: format!("{} labels", x.nrows()),
            got: format!("{} labels", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(PipelineError::EmptyInput {
            stage: "fit",
            rows: x.nrows(),
            cols: x.ncols(),
        });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::DegenerateInput {
            reason: "features contain NaN or infinite values".to_string(),
        });
    }
    let counts = ClassCounts::from_labels(y);
    if !counts.has_both_classes() {
        return Err(PipelineError::DegenerateInput {
            reason: format!(
                "training labels contain only class {}",
                counts.present_class()
            ),
        });
    }
    Ok(counts)
}

/// Validate the column count of a prediction matrix
pub(crate) fn check_features(
    x: &Array2<f64>,
    n_features: usize,
) -> Result<(), PipelineError> {
    if x.ncols() != n_features {
        return Err(PipelineError::ShapeMismatch {
            stage: "predict",
            expected: format!("{} columns", n_features),
            got: format!("{} columns", x.ncols()),
        });
    }
    Ok(())
}

/// Scale a raw importance vector to sum to 1.0, or leave it all zero
pub(crate) fn normalize_importances(raw: &[f64]) -> Vec<f64> {
    let total: f64 = raw.iter().sum();
    if total > 0.0 && total.is_finite() {
        raw.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; raw.len()]
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
