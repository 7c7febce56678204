//! Second-order gradient boosting with regularized leaves.
//!
//! - Gradient and hessian of the log-loss drive every tree
//! - Leaf weight: w* = -G / (H + lambda), shrunk by the learning rate
//! - Split gain: 0.5 * [GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ)], kept only above gamma
//! - Children need at least `min_child_weight` hessian mass
//! - Positive rows have their gradient and hessian scaled by `scale_pos_weight`

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{check_features, check_training, normalize_importances, sigmoid, Classifier};
use crate::pipeline::error::PipelineError;

const PARALLEL_SPLIT_MIN_WORK: usize = 8192;
const MIN_GAIN: f64 = 1e-12;
const MIN_HESSIAN: f64 = 1e-16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XgbParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    pub min_child_weight: f64,
    /// Multiplier on positive rows' gradient and hessian
    pub scale_pos_weight: f64,
    /// Initial probability for every row
    pub base_score: f64,
}

impl Default for XgbParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.3,
            reg_lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            scale_pos_weight: 1.0,
            base_score: 0.5,
        }
    }
}

impl XgbParams {
    fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |reason: &str| {
            Err(PipelineError::Config {
                reason: reason.to_string(),
            })
        };
        if self.n_estimators == 0 || self.max_depth == 0 {
            return invalid("boosted trees need n_estimators >= 1 and max_depth >= 1");
        }
        if !(self.learning_rate > 0.0) {
            return invalid("learning_rate must be positive");
        }
        if !(self.scale_pos_weight > 0.0 && self.scale_pos_weight.is_finite()) {
            return invalid("scale_pos_weight must be positive and finite");
        }
        if !(self.base_score > 0.0 && self.base_score < 1.0) {
            return invalid("base_score must lie strictly between 0 and 1");
        }
        if self.reg_lambda < 0.0 || self.gamma < 0.0 || self.min_child_weight < 0.0 {
            return invalid("reg_lambda, gamma and min_child_weight must be non-negative");
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum XgbNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct XgbTree {
    nodes: Vec<XgbNode>,
}

impl XgbTree {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                XgbNode::Leaf { weight } => return *weight,
                XgbNode::Split {
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
}

/// Per-feature split statistics used for gain importance
#[derive(Debug, Clone, Default)]
struct SplitTally {
    total_gain: f64,
    count: usize,
}

struct TreeGrower<'a> {
    x: &'a Array2<f64>,
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a XgbParams,
    nodes: Vec<XgbNode>,
    tally: &'a mut [SplitTally],
}

impl TreeGrower<'_> {
    fn structure_score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.reg_lambda)
    }

    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let (g, h) = rows
            .iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]));
        let id = self.nodes.len();
        self.nodes.push(XgbNode::Leaf {
            weight: -g / (h + self.params.reg_lambda) * self.params.learning_rate,
        });

        if depth >= self.params.max_depth
            || rows.len() < 2
            || h < 2.0 * self.params.min_child_weight
        {
            return id;
        }

        let Some((feature, threshold, gain)) = self.best_split(&rows, g, h) else {
            return id;
        };

        self.tally[feature].total_gain += gain;
        self.tally[feature].count += 1;
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.x[[r, feature]] <= threshold);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = XgbNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<(usize, f64, f64)> {
        let n_features = self.x.ncols();
        let search = |f: usize| self.best_threshold(rows, f, g, h);
        let found: Vec<Option<(f64, f64)>> = if rows.len() * n_features >= PARALLEL_SPLIT_MIN_WORK {
            (0..n_features).into_par_iter().map(search).collect()
        } else {
            (0..n_features).map(search).collect()
        };

        let mut best: Option<(usize, f64, f64)> = None;
        for (feature, candidate) in found.into_iter().enumerate() {
            if let Some((gain, threshold)) = candidate {
                if gain > self.params.gamma
                    && gain > MIN_GAIN
                    && best.map_or(true, |(_, _, g)| gain > g)
                {
                    best = Some((feature, threshold, gain));
                }
            }
        }
        best
    }

    /// (gain, threshold) of the best cut on one feature
    fn best_threshold(&self, rows: &[usize], feature: usize, g: f64, h: f64) -> Option<(f64, f64)> {
        let mut sorted: Vec<(f64, usize)> = rows.iter().map(|&r| (self.x[[r, feature]], r)).collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let parent = self.structure_score(g, h);
        let min_child = self.params.min_child_weight;
        let (mut gl, mut hl) = (0.0, 0.0);
        let mut best: Option<(f64, f64)> = None;
        for i in 0..sorted.len() - 1 {
            let (value, r) = sorted[i];
            gl += self.grad[r];
            hl += self.hess[r];

            let next = sorted[i + 1].0;
            if next <= value {
                continue;
            }
            let (gr, hr) = (g - gl, h - hl);
            if hl < min_child || hr < min_child {
                continue;
            }
            let gain = 0.5 * (self.structure_score(gl, hl) + self.structure_score(gr, hr) - parent);
            if best.map_or(true, |(b, _)| gain > b) {
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

/// Boosted tree classifier with leaf regularization
pub struct XgbClassifier {
    name: String,
    params: XgbParams,
    base_margin: f64,
    trees: Vec<XgbTree>,
    tally: Vec<SplitTally>,
    n_features: usize,
}

impl XgbClassifier {
    pub fn new(name: &str, params: XgbParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            base_margin: 0.0,
            trees: Vec::new(),
            tally: Vec::new(),
            n_features: 0,
        }
    }

    fn margin(&self, row: ArrayView1<f64>) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }
}

impl Classifier for XgbClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<u8>) -> Result<(), PipelineError> {
        check_training(x, y)?;
        self.params.validate()?;

        let n = x.nrows();
        let row_weight: Vec<f64> = y
            .iter()
            .map(|&v| if v == 1 { self.params.scale_pos_weight } else { 1.0 })
            .collect();
        self.base_margin = (self.params.base_score / (1.0 - self.params.base_score)).ln();
        let mut margins = vec![self.base_margin; n];
        let mut tally = vec![SplitTally::default(); x.ncols()];

        self.trees.clear();
        for _ in 0..self.params.n_estimators {
            let mut grad = Vec::with_capacity(n);
            let mut hess = Vec::with_capacity(n);
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad.push((p - y[i] as f64) * row_weight[i]);
                hess.push((p * (1.0 - p)).max(MIN_HESSIAN) * row_weight[i]);
            }

            let mut grower = TreeGrower {
                x,
                grad: &grad,
                hess: &hess,
                params: &self.params,
                nodes: Vec::new(),
                tally: &mut tally,
            };
            grower.grow((0..n).collect(), 0);
            let tree = XgbTree {
                nodes: grower.nodes,
            };

            for (m, row) in margins.iter_mut().zip(x.rows()) {
                *m += tree.predict_row(row);
            }
            self.trees.push(tree);
        }

        self.tally = tally;
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

    /// Average split gain per feature, normalized to sum to 1.0
    fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let average: Vec<f64> = self
            .tally
            .iter()
            .map(|t| {
                if t.count == 0 {
                    0.0
                } else {
                    t.total_gain / t.count as f64
                }
            })
            .collect();
        Some(normalize_importances(&average))
    }
}
