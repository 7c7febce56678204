//! Feature-importance extraction from fitted tree ensembles.
//!
//! Records are grouped by model in input order and never combined across
//! models: each ensemble's scale is model-local.

use serde::Serialize;

use super::evaluate::StrategyEvaluation;
use super::models::{Classifier, ModelKind};
use super::tuning::BestTunedModel;

/// One feature's importance within one model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportanceRecord {
    /// Column index in the feature matrix
    pub feature: usize,
    pub importance: f64,
    pub model: String,
    /// 1-based position within its model (1 = most important)
    pub rank: usize,
}

/// Rank every model's importances and concatenate them.
///
/// Models without importances are skipped. Within a model, rows are sorted by
/// descending importance with ties kept in feature-index order.
pub fn aggregate(models: &[(&str, &dyn Classifier)]) -> Vec<ImportanceRecord> {
    let mut records = Vec::new();
    for &(name, model) in models {
        let Some(importances) = model.feature_importances() else {
            continue;
        };
        let mut ranked: Vec<(usize, f64)> = importances.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        records.extend(
            ranked
                .into_iter()
                .enumerate()
                .map(|(i, (feature, importance))| ImportanceRecord {
                    feature,
                    importance,
                    model: name.to_string(),
                    rank: i + 1,
                }),
        );
    }
    records
}

/// The importance-capable models of one strategy, with the tuned booster
/// standing in for the untuned one when available.
pub fn importance_sources<'a>(
    evaluation: &'a StrategyEvaluation,
    tuned: Option<&'a BestTunedModel>,
) -> Vec<(&'a str, &'a dyn Classifier)> {
    let mut sources: Vec<(&'a str, &'a dyn Classifier)> = Vec::new();
    for fitted in &evaluation.fitted {
        if !fitted.kind.has_importances() {
            continue;
        }
        if fitted.kind == ModelKind::Xgboost && tuned.is_some() {
            continue;
        }
        sources.push((fitted.kind.display_name(), fitted.model.as_ref()));
    }
    if let Some(best) = tuned {
        let model: &dyn Classifier = &best.model;
        sources.push((best.kind().display_name(), model));
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::PipelineError;
    use ndarray::{Array1, Array2};

    struct Fixed(Option<Vec<f64>>);

    impl Classifier for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        fn fit(&mut self, _: &Array2<f64>, _: &Array1<u8>) -> Result<(), PipelineError> {
            Ok(())
        }
        fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, PipelineError> {
            Ok(Array1::zeros(x.nrows()))
        }
        fn feature_importances(&self) -> Option<Vec<f64>> {
            self.0.clone()
        }
    }

    #[test]
    fn test_sorted_per_model_and_concatenated() {
        let a = Fixed(Some(vec![0.1, 0.6, 0.3]));
        let b = Fixed(Some(vec![0.5, 0.0, 0.5]));
        let none = Fixed(None);
        let models: [(&str, &dyn Classifier); 3] = [
            ("A", &a as &dyn Classifier),
            ("skip", &none as &dyn Classifier),
            ("B", &b as &dyn Classifier),
        ];
        let records = aggregate(&models);

        assert_eq!(records.len(), 6);
        let a_features: Vec<usize> = records[..3].iter().map(|r| r.feature).collect();
        assert_eq!(a_features, vec![1, 2, 0]);
        assert!(records[..3].iter().all(|r| r.model == "A"));

        // ties keep index order
        let b_features: Vec<usize> = records[3..].iter().map(|r| r.feature).collect();
        assert_eq!(b_features, vec![0, 2, 1]);
        assert_eq!(records[5].rank, 3);
        assert_eq!(records.iter().filter(|r| r.model == "B").count(), 3);
    }
}
