//! Binary classification metrics.
//!
//! Class 1 is the positive class throughout. Ratios with a zero denominator
//! are defined as 0.0 rather than raised as errors, so a model that never
//! predicts a positive scores precision = recall = F1 = 0.

use std::fmt;

use ndarray::Array1;
use serde::Serialize;

/// Counts of the four prediction outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn from_labels(y_true: &Array1<u8>, y_pred: &Array1<u8>) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == 1, p == 1) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// The same outcomes seen with class 0 as the positive class
    pub fn flipped(&self) -> Self {
        Self {
            tp: self.tn,
            fp: self.fn_,
            tn: self.tp,
            fn_: self.fp,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn accuracy(c: &ConfusionCounts) -> f64 {
    ratio(c.tp + c.tn, c.total())
}

pub fn precision(c: &ConfusionCounts) -> f64 {
    ratio(c.tp, c.tp + c.fp)
}

pub fn recall(c: &ConfusionCounts) -> f64 {
    ratio(c.tp, c.tp + c.fn_)
}

pub fn f1(c: &ConfusionCounts) -> f64 {
    let (p, r) = (precision(c), recall(c));
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

/// Area under the ROC curve via the Mann-Whitney rank statistic.
///
/// Tied scores share their average rank, so discrete 0/1 predictions are
/// valid input. Returns 0.5 when either class is absent.
pub fn roc_auc(y_true: &Array1<u8>, scores: &Array1<f64>) -> f64 {
    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // ranks are 1-based; the tie group i..=j shares the mean rank
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if y_true[idx] == 1 {
                positive_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let (p, n) = (n_pos as f64, n_neg as f64);
    (positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n)
}

/// One point per distinct score threshold, highest threshold first, preceded
/// by the (recall 0, precision 1) anchor. Returns (recall, precision, thresholds).
pub fn precision_recall_curve(
    y_true: &Array1<u8>,
    scores: &Array1<f64>,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let total_pos = y_true.iter().filter(|&&y| y == 1).count();

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut recalls = vec![0.0];
    let mut precisions = vec![1.0];
    let mut thresholds = Vec::new();
    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if y_true[order[i]] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        recalls.push(ratio(tp, total_pos));
        precisions.push(ratio(tp, tp + fp));
        thresholds.push(threshold);
    }

    (recalls, precisions, thresholds)
}

/// Trapezoidal area under y(x) for x sorted ascending
pub fn trapezoid_auc(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

/// Area under the precision-recall curve, integrated over recall
pub fn pr_auc(y_true: &Array1<u8>, scores: &Array1<f64>) -> f64 {
    let (recalls, precisions, _) = precision_recall_curve(y_true, scores);
    trapezoid_auc(&recalls, &precisions).clamp(0.0, 1.0)
}

/// Precision, recall, F1 and support for one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassScores {
    fn from_counts(c: &ConfusionCounts) -> Self {
        Self {
            precision: precision(c),
            recall: recall(c),
            f1: f1(c),
            support: c.tp + c.fn_,
        }
    }
}

/// Per-class breakdown with accuracy and macro/weighted averages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// Index 0 for class 0, index 1 for class 1
    pub classes: [ClassScores; 2],
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    pub fn new(y_true: &Array1<u8>, y_pred: &Array1<u8>) -> Self {
        let counts = ConfusionCounts::from_labels(y_true, y_pred);
        let classes = [
            ClassScores::from_counts(&counts.flipped()),
            ClassScores::from_counts(&counts),
        ];
        let total = counts.total();

        let macro_avg = ClassScores {
            precision: (classes[0].precision + classes[1].precision) / 2.0,
            recall: (classes[0].recall + classes[1].recall) / 2.0,
            f1: (classes[0].f1 + classes[1].f1) / 2.0,
            support: total,
        };
        let weighted = |f: fn(&ClassScores) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes
                    .iter()
                    .map(|c| f(c) * c.support as f64)
                    .sum::<f64>()
                    / total as f64
            }
        };
        let weighted_avg = ClassScores {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1: weighted(|c| c.f1),
            support: total,
        };

        Self {
            classes,
            accuracy: accuracy(&counts),
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, label: &str, s: &ClassScores| {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label, s.precision, s.recall, s.f1, s.support
            )
        };

        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        row(f, "0", &self.classes[0])?;
        row(f, "1", &self.classes[1])?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}

/// Scores of one model trained on one resampled set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub model: String,
    pub strategy: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
    pub pr_auc: f64,
}

impl MetricRecord {
    /// Threshold metrics from `y_pred`; ROC-AUC and PR-AUC from `ranking_scores`
    pub fn compute(
        model: &str,
        strategy: &str,
        y_true: &Array1<u8>,
        y_pred: &Array1<u8>,
        ranking_scores: &Array1<f64>,
    ) -> Self {
        let counts = ConfusionCounts::from_labels(y_true, y_pred);
        Self {
            model: model.to_string(),
            strategy: strategy.to_string(),
            accuracy: accuracy(&counts),
            precision: precision(&counts),
            recall: recall(&counts),
            f1: f1(&counts),
            roc_auc: roc_auc(y_true, ranking_scores),
            pr_auc: pr_auc(y_true, ranking_scores),
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.accuracy,
            self.precision,
            self.recall,
            self.f1,
            self.roc_auc,
            self.pr_auc,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
