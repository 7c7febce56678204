//! End-to-end pipeline test on the reference imbalanced scenario

use rarity::pipeline::{
    evaluate, fit_transform, resample, scale_pos_weight, split, split_stratified, transform,
    AucMode, ModelRegistry, PipelineConfig, ResamplingStrategy, TestSet,
};
use rarity::report::generate;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_reference_scenario() {
    let (x, y) = common::reference_arrays();
    let config = PipelineConfig {
        stratify: true,
        ..Default::default()
    };
    config.validate().unwrap();

    assert_eq!(split(&x, &y, config.test_fraction, config.seed).unwrap().test_y.len(), 200);

    let partition = split_stratified(&x, &y, config.test_fraction, config.seed).unwrap();
    assert_eq!(partition.test_y.len(), 200);
    assert_eq!(partition.train_y.len(), 800);

    let (imputer, scaler, train_x) = fit_transform(&partition.train_x, None).unwrap();
    let test_x = transform(&partition.test_x, &imputer, &scaler).unwrap();
    let test = TestSet::new(&test_x, &partition.test_y);

    let registry = ModelRegistry::standard(scale_pos_weight(&partition.train_y), config.seed);
    let mut all_records = Vec::new();
    let mut fitted_sets = Vec::new();
    for strategy in ResamplingStrategy::ALL {
        let set = resample(
            strategy,
            &train_x,
            &partition.train_y,
            config.k_neighbors,
            config.seed,
        )
        .unwrap();
        if strategy == ResamplingStrategy::Smote {
            let counts = set.class_counts();
            assert_eq!(counts.positive, counts.negative);
        }

        let evaluation = evaluate(&set, &registry, &test, AucMode::Labels).unwrap();
        assert!(evaluation.failures.is_empty(), "{:?}", evaluation.failures);
        assert_eq!(evaluation.evaluations.len(), 5);
        all_records.extend(evaluation.records().into_iter().cloned());
        fitted_sets.push(evaluation);
    }

    assert_eq!(all_records.len(), 10);
    for record in &all_records {
        assert!(record.is_finite(), "{:?}", record);
        for value in [
            record.accuracy,
            record.precision,
            record.recall,
            record.f1,
            record.roc_auc,
        ] {
            assert!((0.0..=1.0).contains(&value));
        }
    }

    let sources = rarity::pipeline::importance_sources(&fitted_sets[0], None);
    let importances = rarity::pipeline::aggregate(&sources);
    let text = generate(&importances, config.top_n);
    assert_eq!(text.matches("(Model: ").count(), 3 * config.top_n);
}

#[test]
fn test_label_auc_matches_score_auc_only_in_mode() {
    let (x, y) = common::synthetic_arrays(400, 5, 40, 8);
    let partition = split_stratified(&x, &y, 0.25, 1).unwrap();
    let (imputer, scaler, train_x) = fit_transform(&partition.train_x, None).unwrap();
    let test_x = transform(&partition.test_x, &imputer, &scaler).unwrap();
    let test = TestSet::new(&test_x, &partition.test_y);
    let set = resample(ResamplingStrategy::Smote, &train_x, &partition.train_y, 5, 1).unwrap();
    let registry = ModelRegistry::standard(1.0, 1);

    let labels = evaluate(&set, &registry, &test, AucMode::Labels).unwrap();
    let scores = evaluate(&set, &registry, &test, AucMode::Scores).unwrap();

    for (a, b) in labels.evaluations.iter().zip(scores.evaluations.iter()) {
        // threshold metrics do not depend on the AUC source
        assert_eq!(a.record.accuracy, b.record.accuracy);
        assert_eq!(a.record.f1, b.record.f1);
        assert_eq!(a.report, b.report);
    }
}
