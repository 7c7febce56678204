//! Gradient boosting on the log-loss.
//!
//! Starts from the prior log-odds, fits a squared-error tree to the
//! residuals `y - p` at every stage and replaces each leaf's value with a
//! single Newton step `sum(r) / sum(p * (1 - p))` over the rows in that leaf.

use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::tree::{Criterion, MaxFeatures, Tree, TreeParams};
use super::{check_features, check_training, normalize_importances, sigmoid, Classifier, ClassWeight};
use crate::pipeline::error::PipelineError;

/// Denominators smaller than this make the Newton step zero
const MIN_HESSIAN: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbmParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 0,
        }
    }
}

pub struct GradientBoostingClassifier {
    name: String,
    params: GbmParams,
    init_margin: f64,
    trees: Vec<Tree>,
    n_features: usize,
}

impl GradientBoostingClassifier {
    pub fn new(name: &str, params: GbmParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            init_margin: 0.0,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    fn margin(&self, row: ndarray::ArrayView1<f64>) -> f64 {
        self.init_margin
            + self
                .trees
                .iter()
                .map(|t| self.params.learning_rate * t.predict_row(row))
                .sum::<f64>()
    }
}

impl Classifier for GradientBoostingClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<u8>) -> Result<(), PipelineError> {
        let counts = check_training(x, y)?;
        if self.params.n_estimators == 0 || !(self.params.learning_rate > 0.0) {
            return Err(PipelineError::Config {
                reason: "gradient boosting needs n_estimators >= 1 and a positive learning rate"
                    .to_string(),
            });
        }

        let n = x.nrows();
        let targets: Vec<f64> = y.iter().map(|&v| v as f64).collect();
        let prior = counts.positive_rate();
        self.init_margin = (prior / (1.0 - prior)).ln();

        let tree_params = TreeParams {
            criterion: Criterion::SquaredError,
            max_depth: Some(self.params.max_depth),
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: MaxFeatures::All,
            class_weight: ClassWeight::None,
            seed: self.params.seed,
        };
        let unit_weights = vec![1.0; n];
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let mut margins = vec![self.init_margin; n];

        self.trees.clear();
        for _ in 0..self.params.n_estimators {
            let probs: Vec<f64> = margins.iter().map(|&m| sigmoid(m)).collect();
            let residuals: Vec<f64> = targets.iter().zip(&probs).map(|(t, p)| t - p).collect();

            let mut tree = Tree::fit(
                x,
                &residuals,
                &unit_weights,
                (0..n).collect(),
                &tree_params,
                &mut rng,
            );

            let leaves: Vec<usize> = x.rows().into_iter().map(|row| tree.apply(row)).collect();
            let mut numerators = vec![0.0; tree.n_nodes()];
            let mut denominators = vec![0.0; tree.n_nodes()];
            for i in 0..n {
                numerators[leaves[i]] += residuals[i];
                denominators[leaves[i]] += probs[i] * (1.0 - probs[i]);
            }
            for leaf in 0..tree.n_nodes() {
                let step = if denominators[leaf].abs() < MIN_HESSIAN {
                    0.0
                } else {
                    numerators[leaf] / denominators[leaf]
                };
                tree.set_leaf_value(leaf, step);
            }

            for (m, &leaf) in margins.iter_mut().zip(&leaves) {
                *m += self.params.learning_rate * tree.leaf_value(leaf);
            }
            self.trees.push(tree);
        }

        self.n_features = x.ncols();
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, PipelineError> {
        if self.trees.is_empty() {
            return Err(PipelineError::NotFitted {
                model: self.name.clone(),
            });
        }
        check_features(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| sigmoid(self.margin(row))).collect())
    }

    /// Impurity decrease summed over all stages, then normalized
    fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, v) in total.iter_mut().zip(tree.gains()) {
                *acc += v;
            }
        }
        Some(normalize_importances(&total))
    }
}
