//! In-memory feature matrix and label vector

use ndarray::{Array1, Array2};
use serde::Serialize;

use super::error::PipelineError;

/// Rectangular numeric table, one row per customer. Missing values are NaN.
pub type FeatureMatrix = Array2<f64>;

/// One binary label per row, positionally aligned with a [`FeatureMatrix`]
pub type LabelVector = Array1<u8>;

/// Per-class row counts of a label vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClassCounts {
    pub negative: usize,
    pub positive: usize,
}

impl ClassCounts {
    pub fn from_labels(labels: &LabelVector) -> Self {
        let positive = labels.iter().filter(|&&y| y == 1).count();
        Self {
            negative: labels.len() - positive,
            positive,
        }
    }

    pub fn total(&self) -> usize {
        self.negative + self.positive
    }

    /// Fraction of rows labelled 1
    pub fn positive_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.positive as f64 / self.total() as f64
        }
    }

    /// (minority label, minority count, majority count). Ties favour 1 as minority.
    pub fn minority(&self) -> (u8, usize, usize) {
        if self.positive <= self.negative {
            (1, self.positive, self.negative)
        } else {
            (0, self.negative, self.positive)
        }
    }

    pub fn has_both_classes(&self) -> bool {
        self.negative > 0 && self.positive > 0
    }

    /// The class that is present when only one is
    pub fn present_class(&self) -> u8 {
        if self.positive > 0 {
            1
        } else {
            0
        }
    }
}

/// Feature matrix and labels extracted from the input table
#[derive(Debug, Clone)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub features: FeatureMatrix,
    pub labels: LabelVector,
}

impl Dataset {
    pub fn new(
        feature_names: Vec<String>,
        features: FeatureMatrix,
        labels: LabelVector,
    ) -> Result<Self, PipelineError> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::ShapeMismatch {
                stage: "dataset",
                expected: format!("{} labels", features.nrows()),
                got: format!("{} labels", labels.len()),
            });
        }
        if feature_names.len() != features.ncols() {
            return Err(PipelineError::ShapeMismatch {
                stage: "dataset",
                expected: format!("{} feature names", features.ncols()),
                got: format!("{} feature names", feature_names.len()),
            });
        }
        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn class_counts(&self) -> ClassCounts {
        ClassCounts::from_labels(&self.labels)
    }
}
