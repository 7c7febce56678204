//! Rarity: Imbalance-aware Classifier Evaluation CLI Tool
//!
//! A command-line tool that compares classifiers on a rare binary outcome,
//! tunes a boosted-tree model and ranks the features driving the positive class.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use rarity::cli::{choose_resample_fallback, confirm_grid_search, Cli};
use rarity::pipeline::{
    aggregate, dataset_from_frame, evaluate, fit_transform, importance_sources, load_dataset,
    resample_with_fallback, scale_pos_weight, split, split_stratified, transform, tune,
    ModelRegistry, PipelineConfig, PipelineError, PosWeightSource, ResampleFallback,
    ResampledSet, ResamplingStrategy, StrategyEvaluation, TestSet,
};
use rarity::report::{
    display_strategy, display_tuning, export_evaluation, export_recommendations,
    generate_named, importance_table, print_table, ExportParams, RunSummary,
};
use rarity::utils::{
    create_progress_bar, create_spinner, finish_with_success, finish_with_warning, print_banner,
    print_completion, print_config, print_count, print_info, print_step_header, print_step_time,
    print_success, print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.pipeline_config();
    config.validate().context("Invalid configuration")?;

    let output_path = cli.output_path();
    let recommendations_path = cli.recommendations_path();

    // Print styled banner
    print_banner(env!("CARGO_PKG_VERSION"));

    // Print configuration card
    print_config(&cli.input, &output_path, &config);

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");

    let step_start = Instant::now();
    let spinner = create_spinner("Reading input file...");
    let df = load_dataset(&cli.input, cli.infer_schema_length)?;
    let dataset = dataset_from_frame(&df, &config.target_column, &config.drop_columns)
        .with_context(|| format!("Failed to prepare {}", cli.input.display()))?;
    drop(df);
    finish_with_success(&spinner, "Dataset loaded");

    let counts = dataset.class_counts();
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", dataset.n_rows());
    println!("      Features: {}", dataset.n_features());
    println!(
        "      Class 0: {}  Class 1: {}  ({:.2}% positive)",
        counts.negative,
        counts.positive,
        counts.positive_rate() * 100.0
    );

    let mut summary = RunSummary::new(dataset.n_rows(), dataset.n_features(), counts.positive);
    let elapsed = step_start.elapsed();
    summary.add_timing("Load dataset", elapsed);
    print_step_time(elapsed);

    // Step 2: Split and preprocess
    print_step_header(2, "Split & Preprocess");

    let step_start = Instant::now();
    let partition = if config.stratify {
        split_stratified(&dataset.features, &dataset.labels, config.test_fraction, config.seed)?
    } else {
        split(&dataset.features, &dataset.labels, config.test_fraction, config.seed)?
    };
    let (train_counts, test_counts) = (partition.train_counts(), partition.test_counts());
    println!(
        "      Train: {} rows ({} positive)",
        train_counts.total(),
        train_counts.positive
    );
    println!(
        "      Test:  {} rows ({} positive)",
        test_counts.total(),
        test_counts.positive
    );
    summary.set_partition(train_counts.total(), test_counts.total());

    let (imputer, scaler, train_x) =
        fit_transform(&partition.train_x, Some(&dataset.feature_names))?;
    let test_x = transform(&partition.test_x, &imputer, &scaler)?;
    let test = TestSet::new(&test_x, &partition.test_y);
    test.check()
        .context("The test partition must contain both classes; try --stratify or a larger --test-fraction")?;
    print_success("Imputed and standardised with training statistics");

    let spw = match config.pos_weight_source {
        PosWeightSource::FullLabels => scale_pos_weight(&dataset.labels),
        PosWeightSource::TrainPartition => scale_pos_weight(&partition.train_y),
    };
    print_info(&format!(
        "Positive-class weight: {:.3} (from {} labels)",
        spw, config.pos_weight_source
    ));
    let elapsed = step_start.elapsed();
    summary.add_timing("Split & preprocess", elapsed);
    print_step_time(elapsed);

    // Step 3: Resampling
    print_step_header(3, "Synthetic Oversampling");

    let step_start = Instant::now();
    let mut resampled_sets: Vec<ResampledSet> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();
    for strategy in ResamplingStrategy::ALL {
        match resample_strategy(strategy, &train_x, &partition.train_y, &config, cli.no_confirm)? {
            Some(set) => {
                let counts = set.class_counts();
                print_success(&format!(
                    "{}: appended {} synthetic rows (k = {}) -> {} / {}",
                    strategy, set.n_synthetic, set.k_neighbors, counts.negative, counts.positive
                ));
                summary.add_resampled(strategy.display_name(), set.n_synthetic);
                resampled_sets.push(set);
            }
            None => {
                print_warning(&format!("{} skipped", strategy));
                summary.add_skipped(strategy.display_name());
                skipped.push(strategy.display_name().to_string());
            }
        }
    }
    if resampled_sets.is_empty() {
        anyhow::bail!("Every resampling strategy was skipped; nothing to evaluate");
    }
    let elapsed = step_start.elapsed();
    summary.add_timing("Resampling", elapsed);
    print_step_time(elapsed);

    // Step 4: Model evaluation
    print_step_header(4, "Model Evaluation");

    let step_start = Instant::now();
    let registry = ModelRegistry::standard(spw, config.seed);
    let mut evaluations: Vec<StrategyEvaluation> = Vec::with_capacity(resampled_sets.len());
    for set in &resampled_sets {
        let spinner = create_spinner(&format!(
            "Fitting {} models on {} data...",
            registry.len(),
            set.strategy
        ));
        let evaluation = evaluate(set, &registry, &test, config.auc_mode)?;
        if evaluation.failures.is_empty() {
            finish_with_success(&spinner, &format!("{} evaluation complete", set.strategy));
        } else {
            finish_with_warning(
                &spinner,
                &format!(
                    "{} evaluation complete with {} failed model(s)",
                    set.strategy,
                    evaluation.failures.len()
                ),
            );
        }
        display_strategy(&evaluation);
        summary.add_records(evaluation.records(), evaluation.failures.len());
        evaluations.push(evaluation);
    }
    let elapsed = step_start.elapsed();
    summary.add_timing("Model evaluation", elapsed);
    print_step_time(elapsed);

    // Step 5: Grid search
    print_step_header(5, "Hyperparameter Tuning");

    let step_start = Instant::now();
    let tune_set = resampled_sets.iter().find(|s| s.strategy == config.tune_on);
    let tuned = match tune_set {
        None => {
            print_warning(&format!(
                "{} data unavailable; skipping grid search",
                config.tune_on
            ));
            None
        }
        Some(_) if !cli.no_confirm
            && !confirm_grid_search(config.param_grid.len(), config.cv_folds)? =>
        {
            print_info("Grid search skipped");
            None
        }
        Some(set) => {
            let progress = create_progress_bar(
                config.param_grid.len() as u64,
                &format!("Tuning on {}", set.strategy),
            );
            let best = tune(
                set,
                &config.param_grid,
                config.cv_folds,
                spw,
                &test,
                config.auc_mode,
                &progress,
            )?;
            finish_with_success(&progress, "Grid search complete");
            display_tuning(&best);
            summary.add_records([&best.record], 0);
            Some(best)
        }
    };
    let elapsed = step_start.elapsed();
    summary.add_timing("Hyperparameter tuning", elapsed);
    print_step_time(elapsed);

    // Step 6: Importance and recommendations
    print_step_header(6, "Purchase Drivers");

    let step_start = Instant::now();
    let source_evaluation = evaluations
        .iter()
        .find(|e| e.strategy == config.tune_on.display_name())
        .or_else(|| evaluations.first());
    let importances = match source_evaluation {
        Some(evaluation) => {
            print_info(&format!("Importances from {} models", evaluation.strategy));
            aggregate(&importance_sources(evaluation, tuned.as_ref()))
        }
        None => Vec::new(),
    };
    if importances.is_empty() {
        print_warning("No tree ensemble produced feature importances");
    } else {
        print_count("importance record(s)", importances.len(), None);
        print_table(&importance_table(
            &importances,
            &dataset.feature_names,
            config.top_n,
        ));
    }

    let recommendations = generate_named(&importances, config.top_n, &dataset.feature_names);
    println!();
    for line in recommendations.lines() {
        println!("      {}", line);
    }
    let elapsed = step_start.elapsed();
    summary.add_timing("Importance & recommendations", elapsed);
    print_step_time(elapsed);

    // Step 7: Save results
    print_step_header(7, "Save Results");

    let step_start = Instant::now();
    let spinner = create_spinner("Writing evaluation files...");
    let input_display = cli.input.display().to_string();
    let params = ExportParams {
        input_file: &input_display,
        rows: dataset.n_rows(),
        feature_names: &dataset.feature_names,
        scale_pos_weight: spw,
        config: &config,
    };
    export_evaluation(
        &evaluations,
        &skipped,
        tuned.as_ref(),
        &importances,
        &recommendations,
        &output_path,
        &params,
    )?;
    export_recommendations(&recommendations, &recommendations_path)?;
    finish_with_success(&spinner, &format!("Saved to {}", output_path.display()));
    print_info(&format!(
        "Recommendations saved to {}",
        recommendations_path.display()
    ));
    let elapsed = step_start.elapsed();
    summary.add_timing("Save results", elapsed);
    print_step_time(elapsed);

    // Display summary
    summary.display();

    // Final completion message
    print_completion();

    Ok(())
}

/// Resample one strategy, asking how to recover from a too-small minority
/// class when the configured fallback is to abort and prompts are allowed.
fn resample_strategy(
    strategy: ResamplingStrategy,
    x: &ndarray::Array2<f64>,
    y: &ndarray::Array1<u8>,
    config: &PipelineConfig,
    no_confirm: bool,
) -> Result<Option<ResampledSet>> {
    let spinner = create_spinner(&format!("Running {}...", strategy));
    let attempt = resample_with_fallback(
        strategy,
        x,
        y,
        config.k_neighbors,
        config.seed,
        config.resample_fallback,
    );
    spinner.finish_and_clear();

    match attempt {
        Ok(result) => Ok(result),
        Err(PipelineError::InsufficientNeighbors {
            available,
            required,
            ..
        }) if !no_confirm && config.resample_fallback == ResampleFallback::Abort => {
            let fallback = choose_resample_fallback(strategy, available, required)?;
            resample_with_fallback(strategy, x, y, config.k_neighbors, config.seed, fallback)
                .with_context(|| format!("{} resampling failed", strategy))
        }
        Err(e) => Err(e).with_context(|| format!("{} resampling failed", strategy)),
    }
}
