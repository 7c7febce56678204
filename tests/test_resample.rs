//! Integration tests for SMOTE and ADASYN oversampling

use ndarray::s;
use rarity::pipeline::{
    resample, resample_with_fallback, split, PipelineError, ResampleFallback, ResamplingStrategy,
};

#[path = "common/mod.rs"]
mod common;

fn reference_train() -> (ndarray::Array2<f64>, ndarray::Array1<u8>) {
    let (x, y) = common::reference_arrays();
    let partition = split(&x, &y, 0.2, 42).unwrap();
    (partition.train_x, partition.train_y)
}

#[test]
fn test_smote_equalises_classes_on_reference_train() {
    let (x, y) = reference_train();
    let before = rarity::pipeline::ClassCounts::from_labels(&y);

    let set = resample(ResamplingStrategy::Smote, &x, &y, 5, 42).unwrap();
    let after = set.class_counts();

    assert_eq!(after.positive, after.negative);
    assert_eq!(after.negative, before.negative);
    assert_eq!(set.n_synthetic, before.negative - before.positive);
    assert_eq!(set.n_original(), 800);
}

#[test]
fn test_original_rows_kept_verbatim_and_first() {
    let (x, y) = reference_train();
    for strategy in ResamplingStrategy::ALL {
        let set = resample(strategy, &x, &y, 5, 42).unwrap();
        assert_eq!(set.x.slice(s![..800, ..]), x, "{} altered originals", strategy);
        assert_eq!(set.y.slice(s![..800]), y);
        assert!(set.y.slice(s![800..]).iter().all(|&v| v == 1));
    }
}

#[test]
fn test_adasyn_adds_minority_rows() {
    let (x, y) = reference_train();
    let before = rarity::pipeline::ClassCounts::from_labels(&y);
    let set = resample(ResamplingStrategy::Adasyn, &x, &y, 5, 42).unwrap();
    let counts = set.class_counts();

    assert!(set.n_synthetic > 0);
    assert_eq!(counts.positive, before.positive + set.n_synthetic);
    assert_eq!(counts.negative, before.negative);
    assert!(set.x.iter().all(|v| v.is_finite()));
}

/// Six positives mixed into negatives along y = 0, six isolated positives
/// around (100, 100), and a distant block of negatives.
fn mixed_and_isolated_clusters() -> (ndarray::Array2<f64>, ndarray::Array1<u8>) {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..6 {
        let x = i as f64;
        rows.extend([x, 0.0]);
        labels.push(1);
        rows.extend([x, 0.1]);
        labels.push(0);
        rows.extend([x + 0.5, 0.0]);
        labels.push(0);
    }
    for i in 0..6 {
        rows.extend([100.0 + i as f64, 100.0]);
        labels.push(1);
    }
    for i in 0..20 {
        rows.extend([-50.0 - i as f64, -50.0]);
        labels.push(0);
    }
    let x = ndarray::Array2::from_shape_vec((labels.len(), 2), rows).unwrap();
    (x, ndarray::Array1::from(labels))
}

#[test]
fn test_adasyn_synthesises_only_near_majority_neighbours() {
    let (x, y) = mixed_and_isolated_clusters();
    let set = resample(ResamplingStrategy::Adasyn, &x, &y, 5, 42).unwrap();

    assert!(set.n_synthetic > 0);
    let synthetic = set.x.slice(s![set.n_original().., ..]);
    assert_eq!(synthetic.nrows(), set.n_synthetic);
    for row in synthetic.rows() {
        // inside the mixed cluster's bounding box, never near the isolated one
        assert!((0.0..=5.0).contains(&row[0]), "{:?}", row);
        assert_eq!(row[1], 0.0, "{:?}", row);
    }
}

#[test]
fn test_resampling_is_deterministic() {
    let (x, y) = reference_train();
    for strategy in ResamplingStrategy::ALL {
        let a = resample(strategy, &x, &y, 5, 7).unwrap();
        let b = resample(strategy, &x, &y, 5, 7).unwrap();
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
    }
}

#[test]
fn test_tiny_minority_errors_then_falls_back() {
    let (x, y) = common::synthetic_arrays(60, 3, 4, 3);

    let err = resample(ResamplingStrategy::Smote, &x, &y, 5, 42).unwrap_err();
    match err {
        PipelineError::InsufficientNeighbors {
            available, required, ..
        } => {
            assert_eq!(available, 4);
            assert_eq!(required, 5);
        }
        other => panic!("unexpected error: {}", other),
    }

    let skipped = resample_with_fallback(
        ResamplingStrategy::Smote,
        &x,
        &y,
        5,
        42,
        ResampleFallback::Skip,
    )
    .unwrap();
    assert!(skipped.is_none());

    let shrunk = resample_with_fallback(
        ResamplingStrategy::Smote,
        &x,
        &y,
        5,
        42,
        ResampleFallback::ShrinkNeighbors,
    )
    .unwrap()
    .unwrap();
    assert_eq!(shrunk.k_neighbors, 3);
    let counts = shrunk.class_counts();
    assert_eq!(counts.positive, counts.negative);

    assert!(resample_with_fallback(
        ResamplingStrategy::Smote,
        &x,
        &y,
        5,
        42,
        ResampleFallback::Abort,
    )
    .is_err());
}
