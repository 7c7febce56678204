//! Dataset loader for CSV and Parquet files

use anyhow::{Context, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;

use super::dataset::Dataset;
use super::error::PipelineError;

/// Tolerance for floating point comparison when checking binary 0/1 labels
const TOLERANCE: f64 = 1e-9;

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(Some(infer_schema_length))
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    lf.collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))
}

/// Column names of a loaded frame
pub fn get_column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Split a loaded frame into a numeric feature matrix and a 0/1 label vector.
///
/// Every column except `target` and `drop_columns` becomes a feature. Nulls
/// and NaNs in feature columns are kept as NaN for the imputer; labels must
/// all be present.
pub fn dataset_from_frame(
    df: &DataFrame,
    target: &str,
    drop_columns: &[String],
) -> Result<Dataset, PipelineError> {
    let column_names = get_column_names(df);
    if !column_names.iter().any(|c| c == target) {
        return Err(PipelineError::MissingTarget {
            column: target.to_string(),
            available: column_names,
        });
    }
    if df.height() == 0 {
        return Err(PipelineError::EmptyDataset);
    }

    let labels = extract_labels(df, target)?;

    let feature_names: Vec<String> = column_names
        .into_iter()
        .filter(|name| name != target && !drop_columns.contains(name))
        .collect();
    if feature_names.is_empty() {
        return Err(PipelineError::EmptyInput {
            stage: "loader",
            rows: df.height(),
            cols: 0,
        });
    }

    let columns = feature_names
        .iter()
        .map(|name| extract_feature(df, name))
        .collect::<Result<Vec<_>, _>>()?;

    let features = Array2::from_shape_fn((df.height(), columns.len()), |(i, j)| columns[j][i]);

    Dataset::new(feature_names, features, labels)
}

fn extract_labels(df: &DataFrame, target: &str) -> Result<Array1<u8>, PipelineError> {
    let column = df
        .column(target)
        .map_err(|_| PipelineError::MissingTarget {
            column: target.to_string(),
            available: get_column_names(df),
        })?;

    if !is_numeric_like(column.dtype()) {
        return Err(PipelineError::NonBinaryTarget {
            column: target.to_string(),
            value: format!("values of type {}", column.dtype()),
        });
    }

    let cast = column
        .cast(&DataType::Float64)
        .map_err(|e| PipelineError::NonBinaryTarget {
            column: target.to_string(),
            value: e.to_string(),
        })?;
    let values = cast.f64().map_err(|e| PipelineError::NonBinaryTarget {
        column: target.to_string(),
        value: e.to_string(),
    })?;

    let mut labels = Vec::with_capacity(values.len());
    for (row, value) in values.into_iter().enumerate() {
        match value {
            None => {
                return Err(PipelineError::MissingLabel {
                    column: target.to_string(),
                    row,
                })
            }
            Some(v) if v.is_nan() => {
                return Err(PipelineError::MissingLabel {
                    column: target.to_string(),
                    row,
                })
            }
            Some(v) if v.abs() < TOLERANCE => labels.push(0u8),
            Some(v) if (v - 1.0).abs() < TOLERANCE => labels.push(1u8),
            Some(v) => {
                return Err(PipelineError::NonBinaryTarget {
                    column: target.to_string(),
                    value: format!("{}", v),
                })
            }
        }
    }

    Ok(Array1::from(labels))
}

fn extract_feature(df: &DataFrame, name: &str) -> Result<Vec<f64>, PipelineError> {
    let non_numeric = |dtype: &DataType| PipelineError::NonNumericColumn {
        column: name.to_string(),
        dtype: dtype.to_string(),
    };

    let column = df.column(name).map_err(|_| PipelineError::MissingTarget {
        column: name.to_string(),
        available: get_column_names(df),
    })?;
    if !is_numeric_like(column.dtype()) {
        return Err(non_numeric(column.dtype()));
    }

    let cast = column
        .cast(&DataType::Float64)
        .map_err(|_| non_numeric(column.dtype()))?;
    let values: Vec<f64> = cast
        .f64()
        .map_err(|_| non_numeric(column.dtype()))?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    if values.iter().all(|v| v.is_nan()) {
        return Err(PipelineError::AllMissingColumn {
            column: name.to_string(),
        });
    }

    Ok(values)
}

fn is_numeric_like(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean | DataType::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_features_exclude_target_and_dropped() {
        let df = df! {
            "id" => [1i64, 2, 3],
            "age" => [30.0, 40.0, 50.0],
            "target" => [0i64, 1, 0],
        }
        .unwrap();

        let dataset = dataset_from_frame(&df, "target", &["id".to_string()]).unwrap();
        assert_eq!(dataset.feature_names, vec!["age".to_string()]);
        assert_eq!(dataset.labels.to_vec(), vec![0, 1, 0]);
    }

    #[test]
    fn test_nulls_become_nan() {
        let df = df! {
            "x" => [Some(1.0), None, Some(3.0)],
            "target" => [0i32, 1, 0],
        }
        .unwrap();

        let dataset = dataset_from_frame(&df, "target", &[]).unwrap();
        assert!(dataset.features[[1, 0]].is_nan());
    }

    #[test]
    fn test_string_feature_rejected() {
        let df = df! {
            "region" => ["north", "south"],
            "target" => [0i32, 1],
        }
        .unwrap();

        let err = dataset_from_frame(&df, "target", &[]).unwrap_err();
        assert!(matches!(err, PipelineError::NonNumericColumn { .. }));
    }
}
