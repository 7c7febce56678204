//! Integration tests for partitioning and train-fitted preprocessing

use ndarray::{array, Axis};
use rarity::pipeline::{fit_transform, split, split_stratified, transform, PipelineError};

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_partition_is_disjoint_and_complete() {
    let (x, y) = common::reference_arrays();
    let partition = split(&x, &y, 0.2, 42).unwrap();

    assert_eq!(partition.test_indices.len(), 200);
    assert_eq!(partition.train_indices.len(), 800);

    let mut all: Vec<usize> = partition
        .train_indices
        .iter()
        .chain(partition.test_indices.iter())
        .copied()
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..1000).collect::<Vec<_>>());

    // rows travel with their labels
    for (pos, &idx) in partition.test_indices.iter().enumerate() {
        assert_eq!(partition.test_y[pos], y[idx]);
        assert_eq!(partition.test_x.row(pos), x.row(idx));
    }
}

#[test]
fn test_same_seed_same_split() {
    let (x, y) = common::reference_arrays();
    let a = split(&x, &y, 0.2, 42).unwrap();
    let b = split(&x, &y, 0.2, 42).unwrap();
    let c = split(&x, &y, 0.2, 43).unwrap();

    assert_eq!(a.test_indices, b.test_indices);
    assert_ne!(a.test_indices, c.test_indices);
}

#[test]
fn test_test_size_rounds_up() {
    let (x, y) = common::synthetic_arrays(11, 2, 3, 1);
    let partition = split(&x, &y, 0.25, 0).unwrap();
    assert_eq!(partition.test_indices.len(), 3);
}

#[test]
fn test_stratified_keeps_class_ratio() {
    let (x, y) = common::reference_arrays();
    let partition = split_stratified(&x, &y, 0.2, 42).unwrap();

    assert_eq!(partition.test_counts().total(), 200);
    assert_eq!(partition.test_counts().positive, 6);
    assert_eq!(partition.train_counts().positive, 24);
}

#[test]
fn test_invalid_fraction_is_config_error() {
    let (x, y) = common::synthetic_arrays(20, 2, 4, 1);
    for fraction in [0.0, 1.0, -0.5, 1.5] {
        assert!(matches!(
            split(&x, &y, fraction, 42),
            Err(PipelineError::Config { .. })
        ));
    }
}

#[test]
fn test_train_fit_standardises_train_columns() {
    let (x, y) = common::reference_arrays();
    let partition = split(&x, &y, 0.2, 42).unwrap();
    let (_, _, train) = fit_transform(&partition.train_x, None).unwrap();

    for column in train.axis_iter(Axis(1)) {
        let mean = column.mean().unwrap();
        let var = column.mapv(|v| (v - mean).powi(2)).mean().unwrap();
        common::assert_close(mean, 0.0, 1e-9);
        common::assert_close(var, 1.0, 1e-9);
    }
}

#[test]
fn test_transform_is_fixed_affine_map() {
    let train = array![[1.0, 10.0], [3.0, 20.0], [5.0, 30.0]];
    let (imputer, scaler, _) = fit_transform(&train, None).unwrap();

    let other = array![[2.0, 15.0], [100.0, -5.0]];
    let once = transform(&other, &imputer, &scaler).unwrap();
    let twice = transform(&other, &imputer, &scaler).unwrap();
    assert_eq!(once, twice);

    // (v - mean) / scale with the training statistics
    let scale0 = (8.0f64 / 3.0).sqrt();
    common::assert_close(once[[0, 0]], (2.0 - 3.0) / scale0, 1e-12);
    common::assert_close(once[[1, 0]], (100.0 - 3.0) / scale0, 1e-12);
    assert_eq!(scaler.means, array![3.0, 20.0]);
}

#[test]
fn test_missing_values_take_training_mean() {
    let train = array![[1.0, f64::NAN], [3.0, 4.0], [f64::NAN, 8.0]];
    let (imputer, scaler, scaled) = fit_transform(&train, None).unwrap();

    assert_eq!(imputer.means, array![2.0, 6.0]);
    assert!(scaled.iter().all(|v| v.is_finite()));

    let test = array![[f64::NAN, f64::NAN]];
    let out = transform(&test, &imputer, &scaler).unwrap();
    // imputed to the mean, so exactly centred
    assert_eq!(out, array![[0.0, 0.0]]);
}

#[test]
fn test_column_count_mismatch() {
    let train = array![[1.0, 2.0], [3.0, 4.0]];
    let (imputer, scaler, _) = fit_transform(&train, None).unwrap();
    let bad = array![[1.0, 2.0, 3.0]];
    assert!(matches!(
        transform(&bad, &imputer, &scaler),
        Err(PipelineError::ShapeMismatch { .. })
    ));
}
