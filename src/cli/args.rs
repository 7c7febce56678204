//! Command-line argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

use crate::pipeline::{
    AucMode, ParamGrid, PipelineConfig, PosWeightSource, ResampleFallback, ResamplingStrategy,
};

/// Rarity - Compare classifiers on a rare binary outcome and rank its drivers
#[derive(Parser, Debug)]
#[command(name = "rarity")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Binary target column name (values 0 and 1)
    #[arg(short, long, default_value = "target")]
    pub target: String,

    /// Output JSON path.
    /// Defaults to input directory with '_evaluation.json' suffix (e.g., data.csv -> data_evaluation.json).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Fraction of rows held out for testing (exclusive 0 to 1)
    #[arg(long, default_value = "0.2", value_parser = validate_test_fraction)]
    pub test_fraction: f64,

    /// Seed for splitting, resampling and ensemble randomness
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Keep the class ratio equal in train and test partitions
    #[arg(long, default_value = "false")]
    pub stratify: bool,

    /// Nearest neighbours used to interpolate synthetic minority rows
    #[arg(short = 'k', long, default_value = "5", value_parser = validate_positive)]
    pub k_neighbors: usize,

    /// What to do when the minority class is too small for k.
    /// Options: "abort" (default, asks interactively unless --no-confirm), "shrink", "skip"
    #[arg(long, default_value = "abort")]
    pub on_resample_error: ResampleFallback,

    /// Stratified folds for the grid-search cross-validation
    #[arg(long, default_value = "3", value_parser = validate_folds)]
    pub cv_folds: usize,

    /// Grid values for the boosted model's tree count (comma-separated)
    #[arg(long, value_delimiter = ',', default_values_t = vec![100, 200])]
    pub n_estimators: Vec<usize>,

    /// Grid values for the boosted model's tree depth (comma-separated)
    #[arg(long, value_delimiter = ',', default_values_t = vec![3, 5])]
    pub max_depths: Vec<usize>,

    /// Grid values for the boosted model's learning rate (comma-separated)
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.01, 0.1])]
    pub learning_rates: Vec<f64>,

    /// Features per model listed in the recommendations
    #[arg(long, default_value = "5", value_parser = validate_positive)]
    pub top_n: usize,

    /// Labels used for the boosted model's positive-class weight.
    /// Options: "train" (default, training partition only) or "full" (all labels)
    #[arg(long, default_value = "train")]
    pub pos_weight_source: PosWeightSource,

    /// What ROC/PR-AUC is computed from on the test partition.
    /// Options: "labels" (default, thresholded predictions) or "scores" (probabilities)
    #[arg(long, default_value = "labels")]
    pub auc_from: AucMode,

    /// Resampled set used for grid search and importance extraction
    #[arg(long, default_value = "smote")]
    pub tune_on: ResamplingStrategy,

    /// Columns to drop before processing (comma-separated).
    /// Identifier columns belong here.
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Higher values improve type detection for ambiguous columns but may be slower.
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    /// Collect the run configuration from the parsed flags.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            target_column: self.target.clone(),
            drop_columns: self.drop_columns.clone(),
            test_fraction: self.test_fraction,
            seed: self.seed,
            stratify: self.stratify,
            k_neighbors: self.k_neighbors,
            resample_fallback: self.on_resample_error,
            cv_folds: self.cv_folds,
            param_grid: ParamGrid {
                n_estimators: self.n_estimators.clone(),
                max_depth: self.max_depths.clone(),
                learning_rate: self.learning_rates.clone(),
            },
            top_n: self.top_n,
            pos_weight_source: self.pos_weight_source,
            auc_mode: self.auc_from,
            tune_on: self.tune_on,
        }
    }

    /// Get the output path, deriving from input if not explicitly provided.
    /// The derived path will be in the same directory as the input with an '_evaluation.json' suffix.
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.sibling_path("evaluation.json"))
    }

    /// Recommendation text path, next to the input with a '_recommendations.txt' suffix.
    pub fn recommendations_path(&self) -> PathBuf {
        self.sibling_path("recommendations.txt")
    }

    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let parent = self
            .input
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."));
        let stem = self
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        parent.join(format!("{}_{}", stem, suffix))
    }
}

/// Validator for test_fraction parameter
fn validate_test_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value <= 0.0 || value >= 1.0 {
        Err(format!(
            "test_fraction must be strictly between 0.0 and 1.0, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}

/// Validator for counts that must be at least one
fn validate_positive(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid positive integer", s))?;

    if value == 0 {
        Err("value must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

/// Validator for cv_folds parameter
fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid integer", s))?;

    if value < 2 {
        Err(format!("cv_folds must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}
