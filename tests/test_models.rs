//! Integration tests for the classifier registry

use ndarray::{Array1, Array2};
use rarity::pipeline::models::{
    Classifier, DecisionTreeClassifier, ForestParams, GbmParams, GradientBoostingClassifier,
    LogisticParams, LogisticRegression, ModelKind, ModelRegistry, RandomForestClassifier,
    TreeParams, XgbClassifier, XgbParams,
};
use rarity::pipeline::{scale_pos_weight, PipelineError};

#[path = "common/mod.rs"]
mod common;

/// Two well-separated blobs with a 1-in-4 positive rate
fn separable() -> (Array2<f64>, Array1<u8>) {
    let (mut x, y) = common::synthetic_arrays(200, 4, 50, 11);
    for (mut row, &label) in x.rows_mut().into_iter().zip(y.iter()) {
        if label == 1 {
            row[0] += 6.0;
        }
    }
    (x, y)
}

fn accuracy(model: &dyn Classifier, x: &Array2<f64>, y: &Array1<u8>) -> f64 {
    let pred = model.predict(x).unwrap();
    pred.iter().zip(y.iter()).filter(|(p, t)| p == t).count() as f64 / y.len() as f64
}

fn all_models() -> Vec<Box<dyn Classifier>> {
    vec![
        Box::new(LogisticRegression::new("lr", LogisticParams::default())),
        Box::new(DecisionTreeClassifier::new("dt", TreeParams::default())),
        Box::new(RandomForestClassifier::new(
            "rf",
            ForestParams {
                n_estimators: 25,
                ..Default::default()
            },
        )),
        Box::new(GradientBoostingClassifier::new(
            "gb",
            GbmParams {
                n_estimators: 30,
                ..Default::default()
            },
        )),
        Box::new(XgbClassifier::new(
            "xgb",
            XgbParams {
                n_estimators: 30,
                ..Default::default()
            },
        )),
    ]
}

#[test]
fn test_every_model_learns_separable_data() {
    let (x, y) = separable();
    for mut model in all_models() {
        model.fit(&x, &y).unwrap();
        let acc = accuracy(model.as_ref(), &x, &y);
        assert!(acc > 0.95, "{} training accuracy {}", model.name(), acc);

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }
}

#[test]
fn test_only_ensembles_report_importances() {
    let (x, y) = separable();
    for mut model in all_models() {
        model.fit(&x, &y).unwrap();
        let name = model.name().to_string();
        match model.feature_importances() {
            Some(importances) => {
                assert!(["rf", "gb", "xgb"].contains(&name.as_str()));
                assert_eq!(importances.len(), 4);
                common::assert_close(importances.iter().sum::<f64>(), 1.0, 1e-9);
                // the shifted column dominates
                let top = importances
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .map(|(i, _)| i);
                assert_eq!(top, Some(0), "{}", name);
            }
            None => assert!(["lr", "dt"].contains(&name.as_str())),
        }
    }
}

#[test]
fn test_importances_stable_across_refits() {
    let (x, y) = separable();
    let params = ForestParams {
        n_estimators: 20,
        seed: 5,
        ..Default::default()
    };
    let mut a = RandomForestClassifier::new("rf", params.clone());
    let mut b = RandomForestClassifier::new("rf", params);
    a.fit(&x, &y).unwrap();
    b.fit(&x, &y).unwrap();
    assert_eq!(a.feature_importances(), b.feature_importances());
}

#[test]
fn test_single_class_fit_is_error() {
    let (x, _) = separable();
    let y = Array1::<u8>::zeros(x.nrows());
    for mut model in all_models() {
        let err = model.fit(&x, &y).unwrap_err();
        assert!(
            matches!(err, PipelineError::DegenerateInput { .. }),
            "{}: {}",
            model.name(),
            err
        );
    }
}

#[test]
fn test_predict_before_fit_is_error() {
    let (x, _) = separable();
    for model in all_models() {
        assert!(matches!(
            model.predict_proba(&x),
            Err(PipelineError::NotFitted { .. })
        ));
    }
}

#[test]
fn test_standard_registry_order_and_names() {
    let registry = ModelRegistry::standard(3.0, 42);
    let names: Vec<&str> = registry.iter().map(|m| m.name()).collect();
    assert_eq!(
        names,
        vec![
            "Logistic Regression",
            "Decision Tree",
            "Random Forest",
            "Gradient Boosting",
            "XGBoost"
        ]
    );
    let built: Vec<String> = registry.iter().map(|m| m.build().name().to_string()).collect();
    assert_eq!(built[4], ModelKind::Xgboost.display_name());
}

#[test]
fn test_scale_pos_weight_ratio() {
    let (_, y) = common::reference_arrays();
    common::assert_close(scale_pos_weight(&y), 970.0 / 30.0, 1e-12);
    assert_eq!(scale_pos_weight(&Array1::<u8>::zeros(5)), 1.0);
}
