//! Rarity: imbalance-aware classifier evaluation
//!
//! A library for comparing classifiers on a rare binary outcome using
//! SMOTE/ADASYN oversampling, tuning a boosted-tree model and ranking the
//! features that drive the positive class.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
