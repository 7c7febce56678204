//! Pipeline module - the evaluation steps from raw table to ranked drivers

pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod importance;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod preprocess;
pub mod resample;
pub mod split;
pub mod tuning;

pub use config::{AucMode, ParamGrid, PipelineConfig, PosWeightSource, ResampleFallback};
pub use dataset::{ClassCounts, Dataset, FeatureMatrix, LabelVector};
pub use error::{ModelStage, PipelineError};
pub use evaluate::{evaluate, FittedModel, ModelEvaluation, StrategyEvaluation, TestSet};
pub use importance::{aggregate, importance_sources, ImportanceRecord};
pub use loader::{dataset_from_frame, get_column_names, load_dataset};
pub use metrics::{ClassificationReport, MetricRecord};
pub use models::{scale_pos_weight, Classifier, ModelKind, ModelRegistry};
pub use preprocess::{fit_transform, transform, MeanImputer, StandardScaler};
pub use resample::{resample, resample_with_fallback, ResampledSet, ResamplingStrategy};
pub use split::{split, split_stratified, Partition};
pub use tuning::{tune, BestTunedModel, CvResult, XgbCandidate};
