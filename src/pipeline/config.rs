//! Run configuration shared by every pipeline step

use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::resample::ResamplingStrategy;

/// Which label vector the boosted model's positive-class weight is computed from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosWeightSource {
    /// Full pre-split label vector (leaks test labels into training)
    FullLabels,
    /// Training partition only
    #[default]
    TrainPartition,
}

impl std::fmt::Display for PosWeightSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PosWeightSource::FullLabels => write!(f, "full"),
            PosWeightSource::TrainPartition => write!(f, "train"),
        }
    }
}

impl std::str::FromStr for PosWeightSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(PosWeightSource::FullLabels),
            "train" => Ok(PosWeightSource::TrainPartition),
            _ => Err(format!(
                "Unknown positive-weight source: '{}'. Use 'full' or 'train'.",
                s
            )),
        }
    }
}

/// What the harness feeds to ROC-AUC and PR-AUC
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AucMode {
    /// Discrete predicted labels (0/1)
    #[default]
    Labels,
    /// Positive-class probabilities
    Scores,
}

impl std::fmt::Display for AucMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AucMode::Labels => write!(f, "labels"),
            AucMode::Scores => write!(f, "scores"),
        }
    }
}

impl std::str::FromStr for AucMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "labels" => Ok(AucMode::Labels),
            "scores" => Ok(AucMode::Scores),
            _ => Err(format!("Unknown AUC mode: '{}'. Use 'labels' or 'scores'.", s)),
        }
    }
}

/// What to do when a resampling strategy cannot run with the configured neighbour count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFallback {
    /// Propagate the error and stop the run
    #[default]
    Abort,
    /// Retry with the largest neighbour count the minority class supports
    ShrinkNeighbors,
    /// Drop the strategy and continue with the others
    Skip,
}

impl std::fmt::Display for ResampleFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleFallback::Abort => write!(f, "abort"),
            ResampleFallback::ShrinkNeighbors => write!(f, "shrink"),
            ResampleFallback::Skip => write!(f, "skip"),
        }
    }
}

impl std::str::FromStr for ResampleFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(ResampleFallback::Abort),
            "shrink" => Ok(ResampleFallback::ShrinkNeighbors),
            "skip" => Ok(ResampleFallback::Skip),
            _ => Err(format!(
                "Unknown resampling fallback: '{}'. Use 'abort', 'shrink' or 'skip'.",
                s
            )),
        }
    }
}

/// Candidate values for the boosted-tree grid search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<usize>,
    pub learning_rate: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 200],
            max_depth: vec![3, 5],
            learning_rate: vec![0.01, 0.1],
        }
    }
}

impl ParamGrid {
    /// Number of candidate configurations
    pub fn len(&self) -> usize {
        self.n_estimators.len() * self.max_depth.len() * self.learning_rate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Complete configuration for one evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the binary label column
    pub target_column: String,
    /// Columns removed before feature extraction (identifiers etc.)
    pub drop_columns: Vec<String>,
    /// Fraction of rows held out for testing, in (0, 1)
    pub test_fraction: f64,
    /// Seed for splitting, resampling and ensemble randomness
    pub seed: u64,
    /// Preserve the class ratio in both partitions
    pub stratify: bool,
    /// Neighbour count for synthetic oversampling
    pub k_neighbors: usize,
    pub resample_fallback: ResampleFallback,
    /// Folds for the grid-search cross-validation
    pub cv_folds: usize,
    pub param_grid: ParamGrid,
    /// Features per model in the recommendation text
    pub top_n: usize,
    pub pos_weight_source: PosWeightSource,
    pub auc_mode: AucMode,
    /// Resampled set used for tuning and importance extraction
    pub tune_on: ResamplingStrategy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_column: "target".to_string(),
            drop_columns: Vec::new(),
            test_fraction: 0.2,
            seed: 42,
            stratify: false,
            k_neighbors: 5,
            resample_fallback: ResampleFallback::Abort,
            cv_folds: 3,
            param_grid: ParamGrid::default(),
            top_n: 5,
            pos_weight_source: PosWeightSource::TrainPartition,
            auc_mode: AucMode::Labels,
            tune_on: ResamplingStrategy::Smote,
        }
    }
}

impl PipelineConfig {
    /// Check every value range before any data is touched
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::Config {
                reason: format!(
                    "test_fraction must be strictly between 0 and 1, got {}",
                    self.test_fraction
                ),
            });
        }
        if self.k_neighbors == 0 {
            return Err(PipelineError::Config {
                reason: "k_neighbors must be at least 1".to_string(),
            });
        }
        if self.cv_folds < 2 {
            return Err(PipelineError::Config {
                reason: format!("cv_folds must be at least 2, got {}", self.cv_folds),
            });
        }
        if self.param_grid.is_empty() {
            return Err(PipelineError::Config {
                reason: "parameter grid has no candidates".to_string(),
            });
        }
        if self.param_grid.n_estimators.contains(&0) || self.param_grid.max_depth.contains(&0) {
            return Err(PipelineError::Config {
                reason: "n_estimators and max_depth candidates must be at least 1".to_string(),
            });
        }
        if self
            .param_grid
            .learning_rate
            .iter()
            .any(|&lr| !(lr > 0.0 && lr.is_finite()))
        {
            return Err(PipelineError::Config {
                reason: "learning_rate candidates must be positive and finite".to_string(),
            });
        }
        if self.top_n == 0 {
            return Err(PipelineError::Config {
                reason: "top_n must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.param_grid.len(), 8);
    }

    #[test]
    fn test_test_fraction_bounds() {
        for bad in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            let config = PipelineConfig {
                test_fraction: bad,
                ..Default::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("test_fraction"));
        }
    }

    #[test]
    fn test_zero_folds_rejected() {
        let config = PipelineConfig {
            cv_folds: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_grid_rejected() {
        let config = PipelineConfig {
            param_grid: ParamGrid {
                n_estimators: vec![],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("FULL".parse::<PosWeightSource>().unwrap(), PosWeightSource::FullLabels);
        assert_eq!("scores".parse::<AucMode>().unwrap(), AucMode::Scores);
        assert_eq!(
            "shrink".parse::<ResampleFallback>().unwrap(),
            ResampleFallback::ShrinkNeighbors
        );
        assert!("sometimes".parse::<ResampleFallback>().is_err());
    }

    #[test]
    fn test_config_serializes() {
        let json = serde_json::to_string(&PipelineConfig::default()).unwrap();
        assert!(json.contains("\"pos_weight_source\":\"train_partition\""));
        assert!(json.contains("\"tune_on\":\"smote\""));
    }
}
