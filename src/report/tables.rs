//! comfy-table views of metric, tuning and importance results

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::evaluate::{ModelEvaluation, StrategyEvaluation};
use crate::pipeline::tuning::{BestTunedModel, CvResult, XgbCandidate};
use crate::pipeline::{ImportanceRecord, MetricRecord};

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|l| Cell::new(l).add_attribute(Attribute::Bold))
        .collect()
}

fn score_cell(value: f64) -> Cell {
    let color = if value >= 0.75 {
        Color::Green
    } else if value >= 0.5 {
        Color::Yellow
    } else {
        Color::Red
    };
    Cell::new(format!("{:.4}", value))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// Accuracy, precision, recall, F1 and ROC-AUC, one row per model
pub fn metrics_table(records: &[&MetricRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&[
        "Model",
        "Accuracy",
        "Precision",
        "Recall",
        "F1 Score",
        "ROC AUC",
    ]));
    for r in records {
        table.add_row(vec![
            Cell::new(&r.model),
            score_cell(r.accuracy),
            score_cell(r.precision),
            score_cell(r.recall),
            score_cell(r.f1),
            score_cell(r.roc_auc),
        ]);
    }
    table
}

/// PR-AUC, one row per model
pub fn pr_auc_table(records: &[&MetricRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Model", "PR AUC"]));
    for r in records {
        table.add_row(vec![Cell::new(&r.model), score_cell(r.pr_auc)]);
    }
    table
}

/// Every grid candidate with its mean CV score; the winner is highlighted
pub fn tuning_table(cv_results: &[CvResult], best: &XgbCandidate) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&[
        "learning_rate",
        "max_depth",
        "n_estimators",
        "Mean CV ROC AUC",
    ]));
    for result in cv_results {
        let is_best = &result.params == best;
        let mut row = vec![
            Cell::new(result.params.learning_rate),
            Cell::new(result.params.max_depth),
            Cell::new(result.params.n_estimators),
            Cell::new(format!("{:.4}", result.mean_score)).set_alignment(CellAlignment::Right),
        ];
        if is_best {
            row = row
                .into_iter()
                .map(|c| c.fg(Color::Green).add_attribute(Attribute::Bold))
                .collect();
        }
        table.add_row(row);
    }
    table
}

/// Top `top_n` features of each model in input order
pub fn importance_table(
    records: &[ImportanceRecord],
    feature_names: &[String],
    top_n: usize,
) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(header(&["Model", "Rank", "Feature", "Name", "Importance"]));
    for r in records.iter().filter(|r| r.rank <= top_n) {
        let name = feature_names
            .get(r.feature)
            .map(String::as_str)
            .unwrap_or("-");
        table.add_row(vec![
            Cell::new(&r.model),
            Cell::new(r.rank),
            Cell::new(r.feature),
            Cell::new(name),
            Cell::new(format!("{:.4}", r.importance)).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Print a table indented to line up with the step output
pub fn print_table(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

fn print_section(icon: &str, title: &str) {
    println!();
    println!("    {} {}", style(icon).cyan(), style(title).white().bold());
    println!("    {}", style("─".repeat(50)).dim());
}

/// One titled classification report per model, in evaluation order
pub fn classification_reports(evaluations: &[ModelEvaluation]) -> String {
    let mut out = String::new();
    for evaluation in evaluations {
        out.push_str(&format!(
            "Classification report for {}:\n",
            evaluation.record.model
        ));
        out.push_str(&evaluation.report.to_string());
        out.push('\n');
    }
    out
}

/// Both per-strategy tables, each model's report and any model failures
pub fn display_strategy(evaluation: &StrategyEvaluation) {
    let records = evaluation.records();
    print_section("📋", &format!("{} METRICS", evaluation.strategy));
    print_table(&metrics_table(&records));
    print_section("📈", &format!("{} PR AUC", evaluation.strategy));
    print_table(&pr_auc_table(&records));

    print_section("🧾", &format!("{} CLASSIFICATION REPORTS", evaluation.strategy));
    println!();
    for line in classification_reports(&evaluation.evaluations).lines() {
        println!("      {}", line);
    }

    if !evaluation.failures.is_empty() {
        println!();
        println!(
            "      {} {}:",
            style("Failed Models").yellow(),
            style(format!("({})", evaluation.failures.len())).dim()
        );
        for failure in &evaluation.failures {
            println!("        {} {}", style("•").dim(), failure);
        }
    }
}

/// Grid results, the winning parameters and the refit's test report
pub fn display_tuning(best: &BestTunedModel) {
    print_section("🔍", &format!("GRID SEARCH ({})", best.strategy));
    print_table(&tuning_table(&best.cv_results, &best.params));
    println!();
    println!(
        "      Best parameters: {}",
        style(best.params.to_string()).green().bold()
    );
    println!("      Best CV ROC AUC: {}", style(format!("{:.4}", best.cv_score)).green());
    println!();
    for line in best.report.to_string().lines() {
        println!("      {}", line);
    }
}
