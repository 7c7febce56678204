//! Bagged ensemble of Gini trees

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{Criterion, MaxFeatures, Tree, TreeParams};
use super::{check_features, check_training, normalize_importances, Classifier, ClassWeight};
use crate::pipeline::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    /// Draw each tree's rows with replacement
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            class_weight: ClassWeight::None,
            seed: 0,
        }
    }
}

pub struct RandomForestClassifier {
    name: String,
    params: ForestParams,
    trees: Vec<Tree>,
    n_features: usize,
}

impl RandomForestClassifier {
    pub fn new(name: &str, params: ForestParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            trees: Vec::new(),
            n_features: 0,
        }
    }
}

impl Classifier for RandomForestClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<u8>) -> Result<(), PipelineError> {
        check_training(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(PipelineError::Config {
                reason: "random forest needs at least one tree".to_string(),
            });
        }

        let n = x.nrows();
        let target: Vec<f64> = y.iter().map(|&v| v as f64).collect();
        // class weights come from the full training labels, not each bootstrap
        let weights = self.params.class_weight.sample_weights(y);
        let tree_params = TreeParams {
            criterion: Criterion::Gini,
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: self.params.max_features,
            class_weight: self.params.class_weight,
            seed: self.params.seed,
        };

        // seeds drawn up front so results do not depend on thread scheduling
        let mut master = ChaCha8Rng::seed_from_u64(self.params.seed);
        let tree_seeds: Vec<u64> = (0..self.params.n_estimators).map(|_| master.gen()).collect();
        let bootstrap = self.params.bootstrap;

        self.trees = tree_seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let rows: Vec<usize> = if bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                Tree::fit(x, &target, &weights, rows, &tree_params, &mut rng)
            })
            .collect();
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

        let n_trees = self.trees.len() as f64;
        Ok(x
            .rows()
            .into_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    /// Mean of per-tree normalized importances
    fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, v) in total.iter_mut().zip(tree.feature_importances()) {
                *acc += v;
            }
        }
        Some(normalize_importances(&total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> (Array2<f64>, Array1<u8>) {
        let x = Array2::from_shape_fn((40, 3), |(i, j)| match j {
            0 => if i < 20 { i as f64 * 0.1 } else { 5.0 + i as f64 * 0.1 },
            1 => ((i * 7) % 11) as f64,
            _ => ((i * 3) % 5) as f64,
        });
        let y = Array1::from_shape_fn(40, |i| u8::from(i >= 20));
        (x, y)
    }

    #[test]
    fn test_forest_fits_and_ranks_signal_feature_first() {
        let (x, y) = two_blobs();
        let mut forest = RandomForestClassifier::new(
            "Random Forest",
            ForestParams {
                n_estimators: 25,
                seed: 3,
                ..Default::default()
            },
        );
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.trees.len(), 25);
        assert_eq!(forest.predict(&x).unwrap(), y);

        let importances = forest.feature_importances().unwrap();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[1]);
        assert!(importances[0] > importances[2]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = two_blobs();
        let params = ForestParams {
            n_estimators: 10,
            seed: 11,
            ..Default::default()
        };
        let mut a = RandomForestClassifier::new("a", params.clone());
        let mut b = RandomForestClassifier::new("b", params);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.feature_importances(), b.feature_importances());
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }
}
