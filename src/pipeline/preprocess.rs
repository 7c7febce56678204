//! Mean imputation and standardization.
//!
//! Both transforms are fitted on one matrix (the training partition) and then
//! applied as fixed affine maps to any other matrix. Calling [`transform`]
//! never updates the fitted statistics.

use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

use super::error::PipelineError;

/// Per-column means used to fill missing (NaN) values
#[derive(Debug, Clone, Serialize)]
pub struct MeanImputer {
    pub means: Array1<f64>,
}

impl MeanImputer {
    /// Compute column means over the observed values.
    ///
    /// `feature_names` is only used to name an all-missing column in the error.
    pub fn fit(x: &Array2<f64>, feature_names: Option<&[String]>) -> Result<Self, PipelineError> {
        check_non_empty(x, "imputer")?;

        let mut means = Array1::zeros(x.ncols());
        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let (sum, count) = column
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
            if count == 0 {
                let column = feature_names
                    .and_then(|names| names.get(j).cloned())
                    .unwrap_or_else(|| format!("#{}", j));
                return Err(PipelineError::AllMissingColumn { column });
            }
            means[j] = sum / count as f64;
        }

        Ok(Self { means })
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, PipelineError> {
        check_columns(x, self.means.len(), "imputer")?;
        let mut out = x.clone();
        for (mut column, &mean) in out.axis_iter_mut(Axis(1)).zip(self.means.iter()) {
            column.mapv_inplace(|v| if v.is_nan() { mean } else { v });
        }
        Ok(out)
    }
}

/// Per-column location and scale for zero-mean, unit-variance features
#[derive(Debug, Clone, Serialize)]
pub struct StandardScaler {
    pub means: Array1<f64>,
    /// Population standard deviations; constant columns get 1.0
    pub scales: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self, PipelineError> {
        check_non_empty(x, "scaler")?;

        let means = x
            .mean_axis(Axis(0))
            .ok_or(PipelineError::EmptyInput {
                stage: "scaler",
                rows: x.nrows(),
                cols: x.ncols(),
            })?;
        let scales = x.std_axis(Axis(0), 0.0).mapv(|s| {
            if s > f64::EPSILON && s.is_finite() {
                s
            } else {
                1.0
            }
        });

        Ok(Self { means, scales })
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, PipelineError> {
        check_columns(x, self.means.len(), "scaler")?;
        Ok((x - &self.means) / &self.scales)
    }
}

/// Fit both transforms on `x` and return the transformed copy
pub fn fit_transform(
    x: &Array2<f64>,
    feature_names: Option<&[String]>,
) -> Result<(MeanImputer, StandardScaler, Array2<f64>), PipelineError> {
    let imputer = MeanImputer::fit(x, feature_names)?;
    let imputed = imputer.transform(x)?;
    let scaler = StandardScaler::fit(&imputed)?;
    let scaled = scaler.transform(&imputed)?;
    Ok((imputer, scaler, scaled))
}

/// Apply previously fitted transforms to another matrix
pub fn transform(
    x: &Array2<f64>,
    imputer: &MeanImputer,
    scaler: &StandardScaler,
) -> Result<Array2<f64>, PipelineError> {
    let imputed = imputer.transform(x)?;
    scaler.transform(&imputed)
}

fn check_non_empty(x: &Array2<f64>, stage: &'static str) -> Result<(), PipelineError> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(PipelineError::EmptyInput {
            stage,
            rows: x.nrows(),
            cols: x.ncols(),
        });
    }
    Ok(())
}

fn check_columns(x: &Array2<f64>, expected: usize, stage: &'static str) -> Result<(), PipelineError> {
    if x.ncols() != expected {
        return Err(PipelineError::ShapeMismatch {
            stage,
            expected: format!("{} columns", expected),
            got: format!("{} columns", x.ncols()),
        });
    }
    Ok(())
}
