//! Evaluation export functionality

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::evaluate::StrategyEvaluation;
use crate::pipeline::tuning::{BestTunedModel, CvResult, XgbCandidate};
use crate::pipeline::{ClassificationReport, ImportanceRecord, MetricRecord, PipelineConfig};

/// Metadata about the evaluation run
#[derive(Serialize)]
pub struct EvaluationMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    /// Rarity version
    pub rarity_version: String,
    /// Input file path
    pub input_file: String,
    pub rows: usize,
    pub feature_names: Vec<String>,
    /// Positive-class weight handed to the boosted model
    pub scale_pos_weight: f64,
    pub config: PipelineConfig,
}

/// A model that failed, flattened to strings
#[derive(Serialize)]
pub struct FailureEntry {
    pub family: String,
    pub message: String,
}

/// PR-AUC row
#[derive(Serialize)]
pub struct PrAucEntry {
    pub model: String,
    pub pr_auc: f64,
}

/// Per-model classification report
#[derive(Serialize)]
pub struct ReportEntry {
    pub model: String,
    pub report: ClassificationReport,
}

/// Everything one resampling strategy produced
#[derive(Serialize)]
pub struct StrategyExport {
    pub strategy: String,
    pub metrics: Vec<MetricRecord>,
    pub pr_auc: Vec<PrAucEntry>,
    pub reports: Vec<ReportEntry>,
    pub failures: Vec<FailureEntry>,
}

impl StrategyExport {
    fn from_evaluation(evaluation: &StrategyEvaluation) -> Self {
        Self {
            strategy: evaluation.strategy.clone(),
            metrics: evaluation.records().into_iter().cloned().collect(),
            pr_auc: evaluation
                .evaluations
                .iter()
                .map(|e| PrAucEntry {
                    model: e.record.model.clone(),
                    pr_auc: e.record.pr_auc,
                })
                .collect(),
            reports: evaluation
                .evaluations
                .iter()
                .map(|e| ReportEntry {
                    model: e.record.model.clone(),
                    report: e.report.clone(),
                })
                .collect(),
            failures: evaluation
                .failures
                .iter()
                .map(|f| FailureEntry {
                    family: f.family().to_string(),
                    message: f.to_string(),
                })
                .collect(),
        }
    }
}

/// Grid-search winner and its test-set scores
#[derive(Serialize)]
pub struct TuningExport {
    pub strategy: String,
    pub best_params: XgbCandidate,
    pub cv_score: f64,
    pub cv_results: Vec<CvResult>,
    pub test_metrics: MetricRecord,
    pub classification_report: ClassificationReport,
}

impl TuningExport {
    fn from_best(best: &BestTunedModel) -> Self {
        Self {
            strategy: best.strategy.clone(),
            best_params: best.params,
            cv_score: best.cv_score,
            cv_results: best.cv_results.clone(),
            test_metrics: best.record.clone(),
            classification_report: best.report.clone(),
        }
    }
}

/// Importance row with the column name resolved
#[derive(Serialize)]
pub struct ImportanceEntry {
    #[serde(flatten)]
    pub record: ImportanceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
}

/// Complete evaluation export with metadata
#[derive(Serialize)]
pub struct EvaluationExport {
    pub metadata: EvaluationMetadata,
    pub strategies: Vec<StrategyExport>,
    pub skipped_strategies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuning: Option<TuningExport>,
    pub importances: Vec<ImportanceEntry>,
    pub recommendations: String,
}

/// Parameters for the evaluation export
pub struct ExportParams<'a> {
    pub input_file: &'a str,
    pub rows: usize,
    pub feature_names: &'a [String],
    pub scale_pos_weight: f64,
    pub config: &'a PipelineConfig,
}

/// Assemble the export document without writing it
pub fn build_export(
    evaluations: &[StrategyEvaluation],
    skipped_strategies: &[String],
    tuned: Option<&BestTunedModel>,
    importances: &[ImportanceRecord],
    recommendations: &str,
    params: &ExportParams,
) -> EvaluationExport {
    EvaluationExport {
        metadata: EvaluationMetadata {
            timestamp: Utc::now().to_rfc3339(),
            rarity_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.to_string(),
            rows: params.rows,
            feature_names: params.feature_names.to_vec(),
            scale_pos_weight: params.scale_pos_weight,
            config: params.config.clone(),
        },
        strategies: evaluations.iter().map(StrategyExport::from_evaluation).collect(),
        skipped_strategies: skipped_strategies.to_vec(),
        tuning: tuned.map(TuningExport::from_best),
        importances: importances
            .iter()
            .map(|r| ImportanceEntry {
                record: r.clone(),
                feature_name: params.feature_names.get(r.feature).cloned(),
            })
            .collect(),
        recommendations: recommendations.to_string(),
    }
}

/// Export evaluation results to a JSON file
///
/// # Arguments
/// * `evaluations` - One entry per strategy that ran
/// * `skipped_strategies` - Display names of strategies that were skipped
/// * `tuned` - Grid-search winner, if tuning ran
/// * `importances` - Aggregated importance records
/// * `recommendations` - Rendered recommendation text
/// * `output_path` - Path to write the JSON file
/// * `params` - Export parameters for metadata
pub fn export_evaluation(
    evaluations: &[StrategyEvaluation],
    skipped_strategies: &[String],
    tuned: Option<&BestTunedModel>,
    importances: &[ImportanceRecord],
    recommendations: &str,
    output_path: &Path,
    params: &ExportParams,
) -> Result<()> {
    let export = build_export(
        evaluations,
        skipped_strategies,
        tuned,
        importances,
        recommendations,
        params,
    );

    let json =
        serde_json::to_string_pretty(&export).context("Failed to serialize evaluation to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write evaluation to {}", output_path.display()))?;

    Ok(())
}

/// Write the recommendation text next to the JSON export
pub fn export_recommendations(recommendations: &str, output_path: &Path) -> Result<()> {
    std::fs::write(output_path, recommendations).with_context(|| {
        format!(
            "Failed to write recommendations to {}",
            output_path.display()
        )
    })
}
