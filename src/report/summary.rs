//! Run summary report generation

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::MetricRecord;
use crate::utils::format_duration;

/// Counts and timings collected while the launcher runs
#[derive(Debug, Default)]
pub struct RunSummary {
    pub rows: usize,
    pub features: usize,
    pub positives: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    /// (strategy, synthetic rows appended)
    pub resampled: Vec<(String, usize)>,
    pub skipped_strategies: Vec<String>,
    pub failed_models: usize,
    /// Best model by PR-AUC across all strategies, as (model, strategy, pr_auc)
    pub best_pr_auc: Option<(String, String, f64)>,
    /// (step name, elapsed)
    pub timings: Vec<(String, Duration)>,
}

impl RunSummary {
    pub fn new(rows: usize, features: usize, positives: usize) -> Self {
        Self {
            rows,
            features,
            positives,
            ..Default::default()
        }
    }

    pub fn set_partition(&mut self, train_rows: usize, test_rows: usize) {
        self.train_rows = train_rows;
        self.test_rows = test_rows;
    }

    pub fn add_resampled(&mut self, strategy: &str, n_synthetic: usize) {
        self.resampled.push((strategy.to_string(), n_synthetic));
    }

    pub fn add_skipped(&mut self, strategy: &str) {
        self.skipped_strategies.push(strategy.to_string());
    }

    /// Track failures and keep the record with the highest PR-AUC; earlier records win ties
    pub fn add_records<'a>(&mut self, records: impl IntoIterator<Item = &'a MetricRecord>, failures: usize) {
        self.failed_models += failures;
        for r in records {
            let better = self
                .best_pr_auc
                .as_ref()
                .map_or(true, |(_, _, best)| r.pr_auc > *best);
            if better {
                self.best_pr_auc = Some((r.model.clone(), r.strategy.clone(), r.pr_auc));
            }
        }
    }

    pub fn add_timing(&mut self, step: &str, elapsed: Duration) {
        self.timings.push((step.to_string(), elapsed));
    }

    pub fn total_time(&self) -> Duration {
        self.timings.iter().map(|(_, d)| *d).sum()
    }

    pub fn positive_rate(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.positives as f64 / self.rows as f64
        }
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Rows"), Cell::new(self.rows)]);
        table.add_row(vec![Cell::new("🧮 Features"), Cell::new(self.features)]);

        let rate = self.positive_rate() * 100.0;
        table.add_row(vec![
            Cell::new("🎯 Positive Rate"),
            Cell::new(format!("{:.2}% ({})", rate, self.positives)).fg(if rate < 10.0 {
                Color::Yellow
            } else {
                Color::White
            }),
        ]);

        table.add_row(vec![
            Cell::new("✂️  Train / Test"),
            Cell::new(format!("{} / {}", self.train_rows, self.test_rows)),
        ]);

        for (strategy, n_synthetic) in &self.resampled {
            table.add_row(vec![
                Cell::new(format!("🧪 {} Synthetic", strategy)),
                Cell::new(n_synthetic),
            ]);
        }

        table.add_row(vec![
            Cell::new("⏭️  Skipped Strategies"),
            Cell::new(self.skipped_strategies.len()).fg(if self.skipped_strategies.is_empty() {
                Color::White
            } else {
                Color::Red
            }),
        ]);

        table.add_row(vec![
            Cell::new("❌ Failed Models"),
            Cell::new(self.failed_models).fg(if self.failed_models == 0 {
                Color::White
            } else {
                Color::Red
            }),
        ]);

        if let Some((model, strategy, pr_auc)) = &self.best_pr_auc {
            table.add_row(vec![
                Cell::new("🏆 Best PR AUC"),
                Cell::new(format!("{:.4} ({}, {})", pr_auc, model, strategy))
                    .fg(Color::Green)
                    .add_attribute(Attribute::Bold),
            ]);
        }

        table.add_row(vec![
            Cell::new("⏱️  Total Time"),
            Cell::new(format_duration(self.total_time())).fg(Color::Cyan),
        ]);

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        if !self.timings.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("⏱️").cyan(),
                style("STEP TIMINGS").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            for (step, elapsed) in &self.timings {
                println!(
                    "      {} {:<28} {}",
                    style("•").dim(),
                    step,
                    style(format_duration(*elapsed)).dim()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(model: &str, strategy: &str, pr_auc: f64) -> MetricRecord {
        MetricRecord {
            model: model.to_string(),
            strategy: strategy.to_string(),
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
            roc_auc: 0.5,
            pr_auc,
        }
    }

    #[test]
    fn test_best_pr_auc_keeps_first_on_ties() {
        let mut summary = RunSummary::new(100, 3, 5);
        let records = [
            record("Random Forest", "SMOTE", 0.4),
            record("XGBoost", "SMOTE", 0.4),
        ];
        summary.add_records(records.iter(), 1);
        summary.add_records([record("Decision Tree", "ADASYN", 0.3)].iter(), 0);

        let (model, strategy, _) = summary.best_pr_auc.clone().unwrap();
        assert_eq!(model, "Random Forest");
        assert_eq!(strategy, "SMOTE");
        assert_eq!(summary.failed_models, 1);
    }

    #[test]
    fn test_total_time_sums_steps() {
        let mut summary = RunSummary::new(10, 1, 1);
        summary.add_timing("Load", Duration::from_millis(300));
        summary.add_timing("Split", Duration::from_millis(200));
        assert_eq!(summary.total_time(), Duration::from_millis(500));
        assert!((summary.positive_rate() - 0.1).abs() < 1e-12);
    }
}
