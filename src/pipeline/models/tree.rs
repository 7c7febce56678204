//! Weighted CART trees.
//!
//! [`Tree`] is the shared building block: the decision tree uses it directly
//! with Gini impurity, the random forest fits many of them on bootstrap
//! samples, and gradient boosting fits squared-error trees to residuals and
//! then overwrites their leaf values.

use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{check_features, check_training, Classifier, ClassWeight};
use crate::pipeline::error::PipelineError;

/// Below this many (rows x candidate features) a node is searched sequentially
const PARALLEL_SPLIT_MIN_WORK: usize = 8192;

/// Splits must reduce weighted impurity by more than this
const MIN_GAIN: f64 = 1e-12;

/// Impurity measure used to score splits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Binary Gini impurity on 0/1 targets
    Gini,
    /// Weighted variance, for regression on residuals
    SquaredError,
}

impl Criterion {
    /// Impurity of a node from its weight, weighted sum and weighted sum of squares
    fn impurity(&self, w: f64, s: f64, q: f64) -> f64 {
        if w <= 0.0 {
            return 0.0;
        }
        let mean = s / w;
        match self {
            Criterion::Gini => 2.0 * mean * (1.0 - mean),
            Criterion::SquaredError => (q / w - mean * mean).max(0.0),
        }
    }
}

/// Number of features examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    #[default]
    All,
    /// floor(sqrt(n_features)), at least one
    Sqrt,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => ((n_features as f64).sqrt().floor() as usize).max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub criterion: Criterion,
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub class_weight: ClassWeight,
    pub seed: u64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            criterion: Criterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            class_weight: ClassWeight::None,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted binary tree stored as a flat arena; node 0 is the root.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    /// Weighted impurity decrease accumulated per feature
    gains: Vec<f64>,
}

impl Tree {
    /// Grow a tree on `rows` of `x`. Rows may repeat (bootstrap samples).
    pub fn fit(
        x: &Array2<f64>,
        target: &[f64],
        weights: &[f64],
        rows: Vec<usize>,
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Tree {
        let mut builder = Builder {
            x,
            target,
            weights,
            params,
            n_candidates: params.max_features.resolve(x.ncols()).min(x.ncols()),
            rng,
            nodes: Vec::new(),
            gains: vec![0.0; x.ncols()],
        };
        builder.grow(rows, 0);
        Tree {
            nodes: builder.nodes,
            gains: builder.gains,
        }
    }

    /// Index of the leaf `row` falls into
    pub fn apply(&self, row: ArrayView1<f64>) -> usize {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { .. } => return id,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.leaf_value(self.apply(row))
    }

    /// Value stored at node `id`; 0.0 for internal nodes
    pub fn leaf_value(&self, id: usize) -> f64 {
        match self.nodes.get(id) {
            Some(Node::Leaf { value }) => *value,
            _ => 0.0,
        }
    }

    /// Replace the value stored in a leaf; ignored for internal nodes
    pub fn set_leaf_value(&mut self, leaf: usize, value: f64) {
        if let Some(Node::Leaf { value: v }) = self.nodes.get_mut(leaf) {
            *v = value;
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Unnormalized weighted impurity decrease per feature
    pub fn gains(&self) -> &[f64] {
        &self.gains
    }

    /// Impurity-decrease importances scaled to sum to 1.0
    pub fn feature_importances(&self) -> Vec<f64> {
        super::normalize_importances(&self.gains)
    }
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    target: &'a [f64],
    weights: &'a [f64],
    params: &'a TreeParams,
    n_candidates: usize,
    rng: &'a mut ChaCha8Rng,
    nodes: Vec<Node>,
    gains: Vec<f64>,
}

impl Builder<'_> {
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let (w, s, q) = self.stats(&rows);
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: if w > 0.0 { s / w } else { 0.0 },
        });

        let impurity = self.params.criterion.impurity(w, s, q);
        let min_leaf = self.params.min_samples_leaf.max(1);
        let splittable = rows.len() >= self.params.min_samples_split.max(2)
            && rows.len() >= 2 * min_leaf
            && self.params.max_depth.map_or(true, |d| depth < d)
            && impurity > MIN_GAIN;
        if !splittable {
            return id;
        }

        let features = self.candidate_features();
        let Some((feature, threshold, gain)) =
            self.best_split(&rows, &features, (w, s, q), w * impurity)
        else {
            return id;
        };

        self.gains[feature] += gain;
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[[r, feature]] <= threshold);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn stats(&self, rows: &[usize]) -> (f64, f64, f64) {
        rows.iter().fold((0.0, 0.0, 0.0), |(w, s, q), &r| {
            let wr = self.weights[r];
            let t = self.target[r];
            (w + wr, s + wr * t, q + wr * t * t)
        })
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n = self.x.ncols();
        if self.n_candidates >= n {
            return (0..n).collect();
        }
        let mut picked = index::sample(&mut *self.rng, n, self.n_candidates).into_vec();
        picked.sort_unstable();
        picked
    }

    /// Best (feature, threshold, gain) across `features`; the first feature wins ties
    fn best_split(
        &self,
        rows: &[usize],
        features: &[usize],
        parent: (f64, f64, f64),
        parent_cost: f64,
    ) -> Option<(usize, f64, f64)> {
        let search = |&f: &usize| self.best_threshold(rows, f, parent, parent_cost);
        let found: Vec<Option<(f64, f64)>> = if rows.len() * features.len() >= PARALLEL_SPLIT_MIN_WORK {
            features.par_iter().map(search).collect()
        } else {
            features.iter().map(search).collect()
        };

        let mut best: Option<(usize, f64, f64)> = None;
        for (&feature, candidate) in features.iter().zip(found) {
            if let Some((gain, threshold)) = candidate {
                if gain > MIN_GAIN && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature, threshold, gain));
                }
            }
        }
        best
    }

    /// Sweep the sorted values of one feature; returns (gain, threshold)
    fn best_threshold(
        &self,
        rows: &[usize],
        feature: usize,
        (pw, ps, pq): (f64, f64, f64),
        parent_cost: f64,
    ) -> Option<(f64, f64)> {
        let criterion = self.params.criterion;
        let min_leaf = self.params.min_samples_leaf.max(1);
        let n = rows.len();

        let mut sorted: Vec<(f64, usize)> = rows.iter().map(|&r| (self.x[[r, feature]], r)).collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (mut lw, mut ls, mut lq) = (0.0, 0.0, 0.0);
        let mut best: Option<(f64, f64)> = None;
        for i in 0..n - 1 {
            let (value, r) = sorted[i];
            let (wr, t) = (self.weights[r], self.target[r]);
            lw += wr;
            ls += wr * t;
            lq += wr * t * t;

            let next = sorted[i + 1].0;
            if next <= value || i + 1 < min_leaf || n - i - 1 < min_leaf {
                continue;
            }
            let (rw, rs, rq) = (pw - lw, ps - ls, pq - lq);
            if lw <= 0.0 || rw <= 0.0 {
                continue;
            }
            let cost = lw * criterion.impurity(lw, ls, lq) + rw * criterion.impurity(rw, rs, rq);
            let gain = parent_cost - cost;
            if best.map_or(true, |(g, _)| gain > g) {
                let mut threshold = value + (next - value) / 2.0;
                if threshold >= next {
                    threshold = value;
                }
                best = Some((gain, threshold));
            }
        }
        best
    }
}

/// Single CART classifier
pub struct DecisionTreeClassifier {
    name: String,
    params: TreeParams,
    tree: Option<Tree>,
    n_features: usize,
}

impl DecisionTreeClassifier {
    pub fn new(name: &str, params: TreeParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            tree: None,
            n_features: 0,
        }
    }
}

impl Classifier for DecisionTreeClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<u8>) -> Result<(), PipelineError> {
        check_training(x, y)?;
        let target: Vec<f64> = y.iter().map(|&v| v as f64).collect();
        let weights = self.params.class_weight.sample_weights(y);
        let mut rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        self.tree = Some(Tree::fit(
            x,
            &target,
            &weights,
            (0..x.nrows()).collect(),
            &self.params,
            &mut rng,
        ));
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, PipelineError> {
        let tree = self.tree.as_ref().ok_or_else(|| PipelineError::NotFitted {
            model: self.name.clone(),
        })?;
        check_features(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| tree.predict_row(row)).collect())
    }
}
