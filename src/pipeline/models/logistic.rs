//! L2-regularized logistic regression fitted by full-batch gradient descent

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::{check_features, check_training, sigmoid, Classifier, ClassWeight};
use crate::pipeline::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse regularization strength; the intercept is not penalized
    pub c: f64,
    pub max_iter: usize,
    /// Stop when the gradient norm falls below this
    pub tol: f64,
    pub class_weight: ClassWeight,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tol: 1e-6,
            class_weight: ClassWeight::None,
        }
    }
}

pub struct LogisticRegression {
    name: String,
    params: LogisticParams,
    coefficients: Option<Array1<f64>>,
    intercept: f64,
}

impl LogisticRegression {
    pub fn new(name: &str, params: LogisticParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            coefficients: None,
            intercept: 0.0,
        }
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        &self.name
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<u8>) -> Result<(), PipelineError> {
        check_training(x, y)?;
        if !(self.params.c > 0.0) {
            return Err(PipelineError::Config {
                reason: format!("logistic regression C must be positive, got {}", self.params.c),
            });
        }

        let sample_weights = Array1::from(self.params.class_weight.sample_weights(y));
        let total_weight = sample_weights.sum();
        // objective: weighted mean log-loss + alpha/2 * ||w||^2
        let alpha = 1.0 / (self.params.c * total_weight);
        let targets = y.mapv(|v| v as f64);

        // step size from an upper bound on the Hessian's largest eigenvalue
        let sq_norms = x.map_axis(Axis(1), |row| row.dot(&row));
        let mean_sq_norm = sample_weights.dot(&sq_norms) / total_weight;
        let lr = 1.0 / (0.25 * (mean_sq_norm + 1.0) + alpha);

        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        for _ in 0..self.params.max_iter {
            let margins = x.dot(&weights) + bias;
            let errors = (margins.mapv(sigmoid) - &targets) * &sample_weights / total_weight;

            let dw = x.t().dot(&errors) + alpha * &weights;
            let db = errors.sum();

            let grad_norm = (dw.dot(&dw) + db * db).sqrt();
            if grad_norm < self.params.tol {
                break;
            }
            weights.scaled_add(-lr, &dw);
            bias -= lr * db;
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(PipelineError::DegenerateInput {
                reason: "logistic regression diverged".to_string(),
            });
        }

        self.coefficients = Some(weights);
        self.intercept = bias;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>, PipelineError> {
        let coefficients = self.coefficients.as_ref().ok_or_else(|| PipelineError::NotFitted {
            model: self.name.clone(),
        })?;
        check_features(x, coefficients.len())?;
        Ok((x.dot(coefficients) + self.intercept).mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_learns_linear_boundary() {
        let x = array![[-2.0, 0.1], [-1.5, -0.2], [-1.0, 0.3], [1.0, -0.1], [1.5, 0.2], [2.0, 0.0]];
        let y = array![0, 0, 0, 1, 1, 1];
        let mut model = LogisticRegression::new("Logistic Regression", LogisticParams::default());
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        assert!(model.coefficients.as_ref().unwrap()[0] > 0.0);
    }

    #[test]
    fn test_balanced_weight_shifts_intercept_towards_minority() {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..18 {
            rows.push([(i as f64) / 10.0 - 1.0]);
            labels.push(0u8);
        }
        rows.push([0.5]);
        labels.push(1);
        rows.push([0.8]);
        labels.push(1);
        let x = Array2::from_shape_fn((rows.len(), 1), |(i, _)| rows[i][0]);
        let y = Array1::from(labels);

        let mut plain = LogisticRegression::new("plain", LogisticParams::default());
        plain.fit(&x, &y).unwrap();
        let mut balanced = LogisticRegression::new(
            "balanced",
            LogisticParams {
                class_weight: ClassWeight::Balanced,
                ..Default::default()
            },
        );
        balanced.fit(&x, &y).unwrap();

        assert!(balanced.intercept > plain.intercept);
    }
}
