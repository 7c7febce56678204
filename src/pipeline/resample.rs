//! Synthetic minority oversampling (SMOTE and ADASYN).
//!
//! Both strategies keep every original training row unchanged and in its
//! original position, then append interpolated minority samples. Neighbour
//! search is brute-force Euclidean with ties broken by row index, so output
//! depends only on the input and the seed.

use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayViewMut1, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::ResampleFallback;
use super::dataset::ClassCounts;
use super::error::PipelineError;

/// Oversampling strategy applied to the training partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplingStrategy {
    /// Uniform interpolation until classes are equal
    Smote,
    /// Density-adaptive interpolation, more samples where the majority crowds in
    Adasyn,
}

impl ResamplingStrategy {
    pub const ALL: [ResamplingStrategy; 2] = [ResamplingStrategy::Smote, ResamplingStrategy::Adasyn];

    pub fn display_name(&self) -> &'static str {
        match self {
            ResamplingStrategy::Smote => "SMOTE",
            ResamplingStrategy::Adasyn => "ADASYN",
        }
    }
}

impl std::fmt::Display for ResamplingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for ResamplingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "smote" => Ok(ResamplingStrategy::Smote),
            "adasyn" => Ok(ResamplingStrategy::Adasyn),
            _ => Err(format!(
                "Unknown resampling strategy: '{}'. Use 'smote' or 'adasyn'.",
                s
            )),
        }
    }
}

/// Rebalanced training data produced by one strategy
#[derive(Debug, Clone)]
pub struct ResampledSet {
    pub strategy: ResamplingStrategy,
    pub x: Array2<f64>,
    pub y: Array1<u8>,
    /// Rows appended after the originals
    pub n_synthetic: usize,
    /// Neighbour count actually used
    pub k_neighbors: usize,
}

impl ResampledSet {
    pub fn class_counts(&self) -> ClassCounts {
        ClassCounts::from_labels(&self.y)
    }

    pub fn n_original(&self) -> usize {
        self.y.len() - self.n_synthetic
    }
}

/// Run `strategy` on the training partition
pub fn resample(
    strategy: ResamplingStrategy,
    x: &Array2<f64>,
    y: &Array1<u8>,
    k_neighbors: usize,
    seed: u64,
) -> Result<ResampledSet, PipelineError> {
    match strategy {
        ResamplingStrategy::Smote => smote(x, y, k_neighbors, seed),
        ResamplingStrategy::Adasyn => adasyn(x, y, k_neighbors, seed),
    }
}

/// Run `strategy`, applying `fallback` when the minority class is too small.
///
/// Returns `Ok(None)` when the strategy was skipped.
pub fn resample_with_fallback(
    strategy: ResamplingStrategy,
    x: &Array2<f64>,
    y: &Array1<u8>,
    k_neighbors: usize,
    seed: u64,
    fallback: ResampleFallback,
) -> Result<Option<ResampledSet>, PipelineError> {
    match resample(strategy, x, y, k_neighbors, seed) {
        Ok(set) => Ok(Some(set)),
        Err(err @ PipelineError::InsufficientNeighbors { available, .. }) => match fallback {
            ResampleFallback::Abort => Err(err),
            ResampleFallback::Skip => Ok(None),
            ResampleFallback::ShrinkNeighbors if available >= 2 => {
                resample(strategy, x, y, available - 1, seed).map(Some)
            }
            ResampleFallback::ShrinkNeighbors => Err(err),
        },
        Err(e) => Err(e),
    }
}

/// SMOTE: `majority - minority` samples, each interpolated between a
/// uniformly drawn minority row and one of its k nearest minority neighbours.
pub fn smote(
    x: &Array2<f64>,
    y: &Array1<u8>,
    k_neighbors: usize,
    seed: u64,
) -> Result<ResampledSet, PipelineError> {
    let strategy = ResamplingStrategy::Smote;
    let classes = prepare(strategy, x, y, k_neighbors)?;
    let minority_x = x.select(Axis(0), &classes.minority_rows);
    let n_generate = classes.majority - classes.minority_rows.len();

    let neighbours = nearest_neighbours(&minority_x, &minority_x, k_neighbors, true);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let picks: Vec<usize> = (0..n_generate)
        .map(|_| rng.gen_range(0..minority_x.nrows() * k_neighbors))
        .collect();
    let steps: Vec<f64> = (0..n_generate).map(|_| rng.gen::<f64>()).collect();

    let mut synthetic = Array2::zeros((n_generate, x.ncols()));
    for (s, (&pick, &step)) in picks.iter().zip(steps.iter()).enumerate() {
        let row = pick / k_neighbors;
        let neighbour = neighbours[row][pick % k_neighbors];
        interpolate(
            minority_x.row(row),
            minority_x.row(neighbour),
            step,
            synthetic.row_mut(s),
        );
    }

    assemble(strategy, x, y, synthetic, classes.minority_label, k_neighbors)
}

/// ADASYN: each minority row receives synthetic samples in proportion to the
/// share of majority rows among its k nearest neighbours in the whole set.
pub fn adasyn(
    x: &Array2<f64>,
    y: &Array1<u8>,
    k_neighbors: usize,
    seed: u64,
) -> Result<ResampledSet, PipelineError> {
    let strategy = ResamplingStrategy::Adasyn;
    let classes = prepare(strategy, x, y, k_neighbors)?;
    let minority_x = x.select(Axis(0), &classes.minority_rows);
    let n_target = classes.majority - classes.minority_rows.len();

    // difficulty from neighbours over the full training set, excluding self
    let all_neighbours = nearest_neighbours_excluding(&minority_x, x, k_neighbors, &classes.minority_rows);
    let difficulty: Vec<f64> = all_neighbours
        .iter()
        .map(|nn| {
            nn.iter().filter(|&&j| y[j] != classes.minority_label).count() as f64
                / k_neighbors as f64
        })
        .collect();
    let total: f64 = difficulty.iter().sum();
    if total <= 0.0 {
        return Err(PipelineError::Resampling {
            strategy: strategy.display_name().to_string(),
            reason: "no minority sample has a majority-class neighbour".to_string(),
        });
    }

    let per_row: Vec<usize> = difficulty
        .iter()
        .map(|d| (d / total * n_target as f64).round_ties_even() as usize)
        .collect();
    let n_generate: usize = per_row.iter().sum();

    let neighbours = nearest_neighbours(&minority_x, &minority_x, k_neighbors, true);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let rows: Vec<usize> = per_row
        .iter()
        .enumerate()
        .flat_map(|(i, &count)| std::iter::repeat(i).take(count))
        .collect();
    let cols: Vec<usize> = (0..n_generate).map(|_| rng.gen_range(0..k_neighbors)).collect();
    let steps: Vec<f64> = (0..n_generate).map(|_| rng.gen::<f64>()).collect();

    let mut synthetic = Array2::zeros((n_generate, x.ncols()));
    for s in 0..n_generate {
        let row = rows[s];
        let neighbour = neighbours[row][cols[s]];
        interpolate(
            minority_x.row(row),
            minority_x.row(neighbour),
            steps[s],
            synthetic.row_mut(s),
        );
    }

    assemble(strategy, x, y, synthetic, classes.minority_label, k_neighbors)
}

struct ClassLayout {
    minority_label: u8,
    minority_rows: Vec<usize>,
    majority: usize,
}

fn prepare(
    strategy: ResamplingStrategy,
    x: &Array2<f64>,
    y: &Array1<u8>,
    k_neighbors: usize,
) -> Result<ClassLayout, PipelineError> {
    if x.nrows() != y.len() {
        return Err(PipelineError::ShapeMismatch {
            stage: "resampling",
            expected: format!("{} labels", x.nrows()),
            got: format!("{} labels", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(PipelineError::EmptyInput {
            stage: "resampling",
            rows: x.nrows(),
            cols: x.ncols(),
        });
    }
    if k_neighbors == 0 {
        return Err(PipelineError::Config {
            reason: "k_neighbors must be at least 1".to_string(),
        });
    }

    let counts = ClassCounts::from_labels(y);
    if !counts.has_both_classes() {
        return Err(PipelineError::Resampling {
            strategy: strategy.display_name().to_string(),
            reason: format!(
                "training data contains only class {}",
                counts.present_class()
            ),
        });
    }

    let (minority_label, minority, majority) = counts.minority();
    if minority <= k_neighbors {
        return Err(PipelineError::InsufficientNeighbors {
            strategy: strategy.display_name().to_string(),
            available: minority,
            required: k_neighbors,
        });
    }

    let minority_rows = y
        .iter()
        .enumerate()
        .filter(|(_, &label)| label == minority_label)
        .map(|(i, _)| i)
        .collect();

    Ok(ClassLayout {
        minority_label,
        minority_rows,
        majority,
    })
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| (p - q) * (p - q)).sum()
}

/// k nearest rows of `pool` for every row of `queries`, nearest first.
/// With `skip_self`, query i never matches pool row i.
fn nearest_neighbours(
    queries: &Array2<f64>,
    pool: &Array2<f64>,
    k: usize,
    skip_self: bool,
) -> Vec<Vec<usize>> {
    (0..queries.nrows())
        .into_par_iter()
        .map(|i| {
            let query = queries.row(i);
            let candidates = (0..pool.nrows())
                .filter(|&j| !(skip_self && i == j))
                .map(|j| (squared_distance(query, pool.row(j)), j));
            k_smallest(candidates, k)
        })
        .collect()
}

/// Like [`nearest_neighbours`] where query i sits at row `positions[i]` of `pool`.
fn nearest_neighbours_excluding(
    queries: &Array2<f64>,
    pool: &Array2<f64>,
    k: usize,
    positions: &[usize],
) -> Vec<Vec<usize>> {
    (0..queries.nrows())
        .into_par_iter()
        .map(|i| {
            let query = queries.row(i);
            let candidates = (0..pool.nrows())
                .filter(|&j| j != positions[i])
                .map(|j| (squared_distance(query, pool.row(j)), j));
            k_smallest(candidates, k)
        })
        .collect()
}

fn k_smallest(candidates: impl Iterator<Item = (f64, usize)>, k: usize) -> Vec<usize> {
    let mut all: Vec<(f64, usize)> = candidates.collect();
    all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    all.into_iter().take(k).map(|(_, j)| j).collect()
}

fn interpolate(
    base: ArrayView1<f64>,
    neighbour: ArrayView1<f64>,
    step: f64,
    mut out: ArrayViewMut1<f64>,
) {
    for ((o, &b), &n) in out.iter_mut().zip(base.iter()).zip(neighbour.iter()) {
        *o = b + step * (n - b);
    }
}

fn assemble(
    strategy: ResamplingStrategy,
    x: &Array2<f64>,
    y: &Array1<u8>,
    synthetic: Array2<f64>,
    minority_label: u8,
    k_neighbors: usize,
) -> Result<ResampledSet, PipelineError> {
    let n_synthetic = synthetic.nrows();
    let x_out = concatenate(Axis(0), &[x.view(), synthetic.view()]).map_err(|e| {
        PipelineError::Resampling {
            strategy: strategy.display_name().to_string(),
            reason: e.to_string(),
        }
    })?;
    let y_out = y
        .iter()
        .copied()
        .chain(std::iter::repeat(minority_label).take(n_synthetic))
        .collect::<Array1<u8>>();

    Ok(ResampledSet {
        strategy,
        x: x_out,
        y: y_out,
        n_synthetic,
        k_neighbors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced() -> (Array2<f64>, Array1<u8>) {
        // 40 negatives on a grid, 8 positives in a corner
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            rows.push(vec![(i % 8) as f64, (i / 8) as f64]);
            labels.push(0u8);
        }
        for i in 0..8 {
            rows.push(vec![6.5 + (i % 3) as f64 * 0.3, 4.0 + (i / 3) as f64 * 0.4]);
            labels.push(1u8);
        }
        let x = Array2::from_shape_fn((rows.len(), 2), |(i, j)| rows[i][j]);
        (x, Array1::from(labels))
    }

    #[test]
    fn test_smote_balances_exactly() {
        let (x, y) = imbalanced();
        let set = smote(&x, &y, 5, 42).unwrap();
        let counts = set.class_counts();
        assert_eq!(counts.positive, counts.negative);
        assert_eq!(set.n_synthetic, 32);
        assert_eq!(set.x.slice(ndarray::s![..48, ..]), x);
    }

    #[test]
    fn test_synthetic_rows_stay_inside_minority_hull() {
        let (x, y) = imbalanced();
        let set = smote(&x, &y, 3, 1).unwrap();
        for row in set.x.rows().into_iter().skip(48) {
            assert!(row[0] >= 6.5 - 1e-9 && row[0] <= 7.1 + 1e-9);
            assert!(row[1] >= 4.0 - 1e-9 && row[1] <= 4.8 + 1e-9);
        }
    }

    #[test]
    fn test_adasyn_roughly_balances() {
        let (x, y) = imbalanced();
        let set = adasyn(&x, &y, 5, 42).unwrap();
        let counts = set.class_counts();
        assert_eq!(counts.negative, 40);
        assert!((counts.positive as i64 - 40).abs() <= 8);
    }

    #[test]
    fn test_too_few_minority_rows() {
        let (x, y) = imbalanced();
        let err = smote(&x, &y, 8, 0).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientNeighbors {
                available: 8,
                required: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_fallback_modes() {
        let (x, y) = imbalanced();
        let strategy = ResamplingStrategy::Smote;

        assert!(resample_with_fallback(strategy, &x, &y, 10, 0, ResampleFallback::Abort).is_err());
        assert!(resample_with_fallback(strategy, &x, &y, 10, 0, ResampleFallback::Skip)
            .unwrap()
            .is_none());

        let shrunk = resample_with_fallback(strategy, &x, &y, 10, 0, ResampleFallback::ShrinkNeighbors)
            .unwrap()
            .unwrap();
        assert_eq!(shrunk.k_neighbors, 7);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = Array2::zeros((10, 2));
        let y = Array1::zeros(10);
        let err = smote(&x, &y, 3, 0).unwrap_err();
        assert!(matches!(err, PipelineError::Resampling { .. }));
    }
}
