//! Error types for the evaluation pipeline.
//!
//! Every variant belongs to one of four families: configuration, data,
//! resampling or model. Model failures raised inside the evaluation harness
//! are wrapped in [`PipelineError::Model`] so the caller always learns which
//! model, which resampling strategy and which stage failed.

use std::fmt;

/// Stage of a model run at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStage {
    Fit,
    Predict,
    Score,
}

impl fmt::Display for ModelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelStage::Fit => write!(f, "fit"),
            ModelStage::Predict => write!(f, "predict"),
            ModelStage::Score => write!(f, "score"),
        }
    }
}

/// Errors raised by pipeline components.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Returned when a configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    Config {
        /// Human-readable description of the offending value.
        reason: String,
    },

    /// Returned when a matrix handed to a fitting step has zero rows or zero columns.
    #[error("{stage} received an empty matrix ({rows} rows x {cols} columns)")]
    EmptyInput {
        /// Component that rejected the input.
        stage: &'static str,
        rows: usize,
        cols: usize,
    },

    /// Returned when the label column is absent from the input table.
    #[error("target column '{column}' not found. Available columns: {available:?}")]
    MissingTarget {
        column: String,
        available: Vec<String>,
    },

    /// Returned when the input table has no rows.
    #[error("dataset contains zero rows")]
    EmptyDataset,

    /// Returned when a feature column has no observed value at all.
    #[error("feature column '{column}' contains only missing values")]
    AllMissingColumn {
        /// Column name, or `#<index>` when names are unavailable.
        column: String,
    },

    /// Returned when a feature column cannot be read as numbers.
    #[error("feature column '{column}' has non-numeric type {dtype}")]
    NonNumericColumn { column: String, dtype: String },

    /// Returned when the label column holds something other than 0 and 1.
    #[error("target column '{column}' must contain only 0/1 values, found {value}")]
    NonBinaryTarget { column: String, value: String },

    /// Returned when a row has no label.
    #[error("target column '{column}' has a missing label at row {row}")]
    MissingLabel { column: String, row: usize },

    /// Returned when a step needs both classes but only one is present.
    #[error("{stage} requires both classes, found only class {present}")]
    SingleClass {
        stage: &'static str,
        present: u8,
    },

    /// Returned when matrices or vectors that must align do not.
    #[error("shape mismatch in {stage}: expected {expected}, got {got}")]
    ShapeMismatch {
        stage: &'static str,
        expected: String,
        got: String,
    },

    /// Returned when the minority class is too small for the neighbour count.
    #[error(
        "{strategy} needs more than {required} minority samples for {required} neighbours, found {available}"
    )]
    InsufficientNeighbors {
        strategy: String,
        /// Minority samples available.
        available: usize,
        /// Configured neighbour count.
        required: usize,
    },

    /// Returned when a resampling strategy cannot produce a rebalanced set.
    #[error("{strategy} resampling failed: {reason}")]
    Resampling { strategy: String, reason: String },

    /// Returned by a classifier that cannot learn from the data it was given.
    #[error("degenerate training input: {reason}")]
    DegenerateInput { reason: String },

    /// Returned when predict or importances are requested before fit.
    #[error("{model} has not been fitted")]
    NotFitted { model: String },

    /// A classifier failure with the context needed to diagnose it.
    #[error("{model} failed during {stage} on {strategy} data")]
    Model {
        model: String,
        strategy: String,
        stage: ModelStage,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Wrap a lower-level failure with model, strategy and stage context.
    pub fn in_model(self, model: &str, strategy: &str, stage: ModelStage) -> Self {
        PipelineError::Model {
            model: model.to_string(),
            strategy: strategy.to_string(),
            stage,
            source: Box::new(self),
        }
    }

    /// Short name of the error family, used in reports.
    pub fn family(&self) -> &'static str {
        match self {
            PipelineError::Config { .. } | PipelineError::EmptyInput { .. } => "configuration",
            PipelineError::MissingTarget { .. }
            | PipelineError::EmptyDataset
            | PipelineError::AllMissingColumn { .. }
            | PipelineError::NonNumericColumn { .. }
            | PipelineError::NonBinaryTarget { .. }
            | PipelineError::MissingLabel { .. }
            | PipelineError::SingleClass { .. }
            | PipelineError::ShapeMismatch { .. } => "data",
            PipelineError::InsufficientNeighbors { .. } | PipelineError::Resampling { .. } => {
                "resampling"
            }
            PipelineError::DegenerateInput { .. }
            | PipelineError::NotFitted { .. }
            | PipelineError::Model { .. } => "model",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_insufficient_neighbors_display() {
        let err = PipelineError::InsufficientNeighbors {
            strategy: "SMOTE".to_string(),
            available: 3,
            required: 5,
        };
        assert_eq!(
            err.to_string(),
            "SMOTE needs more than 5 minority samples for 5 neighbours, found 3"
        );
        assert_eq!(err.family(), "resampling");
    }

    #[test]
    fn test_model_wrapper_keeps_source() {
        let err = PipelineError::DegenerateInput {
            reason: "only one class".to_string(),
        }
        .in_model("Decision Tree", "ADASYN", ModelStage::Fit);

        assert_eq!(
            err.to_string(),
            "Decision Tree failed during fit on ADASYN data"
        );
        let source = err.source().unwrap();
        assert!(source.to_string().contains("only one class"));
        assert_eq!(err.family(), "model");
    }

    #[test]
    fn test_missing_target_lists_columns() {
        let err = PipelineError::MissingTarget {
            column: "target".to_string(),
            available: vec!["a".to_string(), "b".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'target'"));
        assert!(msg.contains("\"a\""));
        assert_eq!(err.family(), "data");
    }
}
