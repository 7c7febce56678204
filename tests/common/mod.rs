//! Shared test utilities and fixture generators

#![allow(dead_code)]

use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use tempfile::TempDir;

/// Shift applied to the informative features of positive rows
const SIGNAL: f64 = 1.5;

/// Number of leading features that carry signal
const INFORMATIVE: usize = 3;

/// Imbalanced synthetic data: `positives` rows labelled 1, uniform noise in
/// every feature, and the first three features shifted upwards for positives.
pub fn synthetic_arrays(
    rows: usize,
    features: usize,
    positives: usize,
    seed: u64,
) -> (Array2<f64>, Array1<u8>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut y = Array1::<u8>::zeros(rows);
    for idx in sample(&mut rng, rows, positives).into_iter() {
        y[idx] = 1;
    }
    let mut x = Array2::<f64>::zeros((rows, features));
    for i in 0..rows {
        for j in 0..features {
            let noise: f64 = rng.gen_range(-1.0..1.0) + rng.gen_range(-1.0..1.0);
            let shift = if y[i] == 1 && j < INFORMATIVE { SIGNAL } else { 0.0 };
            x[[i, j]] = noise + shift;
        }
    }
    (x, y)
}

/// The reference scenario: 1000 rows, 10 features, 30 positives, seed 42
pub fn reference_arrays() -> (Array2<f64>, Array1<u8>) {
    synthetic_arrays(1000, 10, 30, 42)
}

/// Same data as [`synthetic_arrays`] as a frame with an `id` column,
/// `feature_0..` columns and an integer `target`.
pub fn synthetic_dataframe(rows: usize, features: usize, positives: usize, seed: u64) -> DataFrame {
    let (x, y) = synthetic_arrays(rows, features, positives, seed);

    let mut columns: Vec<Column> = Vec::with_capacity(features + 2);
    let ids: Vec<i64> = (0..rows as i64).collect();
    columns.push(Column::new("id".into(), ids));
    for j in 0..features {
        let values: Vec<f64> = x.column(j).to_vec();
        columns.push(Column::new(format!("feature_{}", j).into(), values));
    }
    let target: Vec<i32> = y.iter().map(|&v| i32::from(v)).collect();
    columns.push(Column::new("target".into(), target));

    DataFrame::new(columns).unwrap()
}

/// Small frame with a missing feature value and a 2-in-8 positive rate
pub fn create_small_dataframe() -> DataFrame {
    df! {
        "customer_id" => [1i64, 2, 3, 4, 5, 6, 7, 8],
        "age" => [Some(25.0f64), Some(32.0), None, Some(41.0), Some(29.0), Some(55.0), Some(38.0), Some(47.0)],
        "premium" => [100i32, 250, 175, 300, 125, 400, 220, 310],
        "target" => [0i32, 0, 0, 1, 0, 1, 0, 0],
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert two floats agree within `tol`
pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {} within {} of {}",
        actual,
        tol,
        expected
    );
}
