//! Interactive prompts using dialoguer

use anyhow::Result;
use dialoguer::{Confirm, Select};

use crate::pipeline::{ResampleFallback, ResamplingStrategy};

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Ask how to recover when a strategy cannot find `required` neighbours
/// among `available` minority rows.
pub fn choose_resample_fallback(
    strategy: ResamplingStrategy,
    available: usize,
    required: usize,
) -> Result<ResampleFallback> {
    println!(
        "      {} needs more than {} minority rows, found {}",
        strategy, required, available
    );
    let mut options = vec![
        ("Skip this strategy", ResampleFallback::Skip),
        ("Abort the run", ResampleFallback::Abort),
    ];
    if available >= 2 {
        options.insert(
            0,
            ("Retry with fewer neighbours", ResampleFallback::ShrinkNeighbors),
        );
    }
    let labels: Vec<&str> = options.iter().map(|(label, _)| *label).collect();

    let selection = Select::new()
        .with_prompt("How should resampling continue?")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(options[selection].1)
}

/// Prompt user to confirm running the grid search
pub fn confirm_grid_search(candidates: usize, folds: usize) -> Result<bool> {
    let message = format!(
        "Run grid search over {} candidate(s) with {}-fold cross-validation?",
        candidates, folds
    );
    confirm_step(&message)
}
