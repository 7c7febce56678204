//! Seeded holdout split into train and test partitions

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::dataset::ClassCounts;
use super::error::PipelineError;

/// Disjoint train/test rows of one dataset.
///
/// Rows keep the shuffled order they were assigned in; `train_indices` and
/// `test_indices` map them back to positions in the original matrix.
#[derive(Debug, Clone)]
pub struct Partition {
    pub train_x: Array2<f64>,
    pub train_y: Array1<u8>,
    pub test_x: Array2<f64>,
    pub test_y: Array1<u8>,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl Partition {
    pub fn train_counts(&self) -> ClassCounts {
        ClassCounts::from_labels(&self.train_y)
    }

    pub fn test_counts(&self) -> ClassCounts {
        ClassCounts::from_labels(&self.test_y)
    }
}

/// Number of test rows for `n` rows at `test_fraction`, rounded up
pub fn test_size(n: usize, test_fraction: f64) -> usize {
    (test_fraction * n as f64).ceil() as usize
}

/// Shuffle rows with a seeded generator and hold out the first `ceil(f * n)`.
pub fn split(
    x: &Array2<f64>,
    y: &Array1<u8>,
    test_fraction: f64,
    seed: u64,
) -> Result<Partition, PipelineError> {
    let n_test = validate(x, y, test_fraction)?;

    let mut order: Vec<usize> = (0..x.nrows()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let train_indices = order.split_off(n_test);
    Ok(build(x, y, train_indices, order))
}

/// Like [`split`] but keeps each class's share of the test partition as close
/// as possible to its share of the whole dataset.
pub fn split_stratified(
    x: &Array2<f64>,
    y: &Array1<u8>,
    test_fraction: f64,
    seed: u64,
) -> Result<Partition, PipelineError> {
    let n_test = validate(x, y, test_fraction)?;
    let counts = ClassCounts::from_labels(y);
    let n = y.len();

    let mut test_pos = ((n_test as f64) * counts.positive as f64 / n as f64).round() as usize;
    // keep at least one row of each class on both sides when the class allows it
    if counts.positive >= 2 {
        test_pos = test_pos.clamp(1, counts.positive - 1);
    }
    test_pos = test_pos.min(n_test).min(counts.positive);
    let test_neg = (n_test - test_pos).min(counts.negative);
    let test_pos = n_test - test_neg;

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let mut test_indices = Vec::with_capacity(n_test);
    let mut train_indices = Vec::with_capacity(n - n_test);
    let (mut taken_pos, mut taken_neg) = (0, 0);
    for idx in order {
        let to_test = if y[idx] == 1 {
            let take = taken_pos < test_pos;
            taken_pos += take as usize;
            take
        } else {
            let take = taken_neg < test_neg;
            taken_neg += take as usize;
            take
        };
        if to_test {
            test_indices.push(idx);
        } else {
            train_indices.push(idx);
        }
    }

    Ok(build(x, y, train_indices, test_indices))
}

fn validate(x: &Array2<f64>, y: &Array1<u8>, test_fraction: f64) -> Result<usize, PipelineError> {
    if x.nrows() != y.len() {
        return Err(PipelineError::ShapeMismatch {
            stage: "split",
            expected: format!("{} labels", x.nrows()),
            got: format!("{} labels", y.len()),
        });
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::Config {
            reason: format!(
                "test_fraction must be strictly between 0 and 1, got {}",
                test_fraction
            ),
        });
    }
    let n = x.nrows();
    let n_test = test_size(n, test_fraction);
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::Config {
            reason: format!(
                "test_fraction {} leaves an empty partition for {} rows",
                test_fraction, n
            ),
        });
    }
    Ok(n_test)
}

fn build(
    x: &Array2<f64>,
    y: &Array1<u8>,
    train_indices: Vec<usize>,
    test_indices: Vec<usize>,
) -> Partition {
    Partition {
        train_x: x.select(Axis(0), &train_indices),
        train_y: y.select(Axis(0), &train_indices),
        test_x: x.select(Axis(0), &test_indices),
        test_y: y.select(Axis(0), &test_indices),
        train_indices,
        test_indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy(n: usize, positives: usize) -> (Array2<f64>, Array1<u8>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f64);
        let y = Array1::from_shape_fn(n, |i| u8::from(i < positives));
        (x, y)
    }

    #[test]
    fn test_sizes_round_up() {
        let (x, y) = toy(11, 3);
        let part = split(&x, &y, 0.2, 7).unwrap();
        assert_eq!(part.test_y.len(), 3);
        assert_eq!(part.train_y.len(), 8);
    }

    #[test]
    fn test_rows_follow_indices() {
        let (x, y) = toy(20, 5);
        let part = split(&x, &y, 0.25, 1).unwrap();
        for (row, &idx) in part.test_indices.iter().enumerate() {
            assert_eq!(part.test_x.row(row), x.row(idx));
            assert_eq!(part.test_y[row], y[idx]);
        }
    }

    #[test]
    fn test_stratified_keeps_ratio() {
        let (x, y) = toy(100, 10);
        let part = split_stratified(&x, &y, 0.2, 42).unwrap();
        assert_eq!(part.test_y.len(), 20);
        assert_eq!(part.test_counts().positive, 2);
        assert_eq!(part.train_counts().positive, 8);
    }

    #[test]
    fn test_fraction_that_empties_a_side_is_rejected() {
        let (x, y) = toy(3, 1);
        assert!(split(&x, &y, 0.99, 0).is_err());
        assert!(split(&x, &y, 1.0, 0).is_err());
    }
}
