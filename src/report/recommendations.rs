//! Marketing guidance text built from the top-ranked purchase drivers

use std::collections::BTreeMap;

use crate::pipeline::ImportanceRecord;

const HEADER: &str = "Based on the feature importance analysis, the following features are most \
indicative of customer purchasing behavior:";

const STRATEGIES: &str = "Marketing Strategies:
1. Targeted Marketing Campaigns: Focus your marketing campaigns on customers who exhibit high values in these top features.
   - These features are highly predictive of a customer's likelihood to purchase insurance.
   - Tailor your messaging to highlight the benefits that align with these characteristics.
2. Personalized Communication: Develop personalized communication strategies for high-potential buyers.
   - Use insights from these features to address specific customer needs and preferences.
   - Provide customized offers and incentives that resonate with these customers.
3. Feature Monitoring and Updates: Regularly monitor the importance of these features and update your models accordingly.
   - Customer behavior and preferences can change over time, so ensure your models are updated with the latest data.
   - Periodic retraining and feature re-evaluation will help maintain model accuracy and relevance.
4. Enhanced Data Collection: Consider collecting additional data on these top features if not already available.
   - Enriching your dataset with more detailed information on these features can further improve model performance.
   - Use surveys, feedback forms, and other methods to gather more granular data.";

/// Recommendation text with features referred to by column index
pub fn generate(records: &[ImportanceRecord], top_n: usize) -> String {
    render(records, top_n, None)
}

/// Like [`generate`], appending the column name when one is known
pub fn generate_named(
    records: &[ImportanceRecord],
    top_n: usize,
    feature_names: &[String],
) -> String {
    render(records, top_n, Some(feature_names))
}

/// Top `top_n` records of every model, models in alphabetical order.
///
/// Records are assumed to arrive sorted by descending importance within
/// each model, which is what `aggregate` produces.
pub fn top_features(records: &[ImportanceRecord], top_n: usize) -> Vec<&ImportanceRecord> {
    let mut by_model: BTreeMap<&str, Vec<&ImportanceRecord>> = BTreeMap::new();
    for record in records {
        let entry = by_model.entry(record.model.as_str()).or_default();
        if entry.len() < top_n {
            entry.push(record);
        }
    }
    by_model.into_values().flatten().collect()
}

fn render(records: &[ImportanceRecord], top_n: usize, feature_names: Option<&[String]>) -> String {
    let bullets: Vec<String> = top_features(records, top_n)
        .into_iter()
        .map(|r| {
            let name = feature_names.and_then(|names| names.get(r.feature));
            match name {
                Some(name) => format!("- Feature {} [{}] (Model: {})", r.feature, name, r.model),
                None => format!("- Feature {} (Model: {})", r.feature, r.model),
            }
        })
        .collect();

    let mut text = String::new();
    text.push_str(HEADER);
    text.push('\n');
    for bullet in &bullets {
        text.push_str(bullet);
        text.push('\n');
    }
    text.push_str(STRATEGIES);
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(feature: usize, importance: f64, model: &str, rank: usize) -> ImportanceRecord {
        ImportanceRecord {
            feature,
            importance,
            model: model.to_string(),
            rank,
        }
    }

    #[test]
    fn test_models_alphabetical_and_capped() {
        let records = vec![
            record(4, 0.5, "XGBoost", 1),
            record(1, 0.3, "XGBoost", 2),
            record(0, 0.2, "XGBoost", 3),
            record(2, 0.9, "Random Forest", 1),
            record(3, 0.1, "Random Forest", 2),
        ];
        let top = top_features(&records, 2);
        let pairs: Vec<(&str, usize)> = top.iter().map(|r| (r.model.as_str(), r.feature)).collect();
        assert_eq!(
            pairs,
            vec![
                ("Random Forest", 2),
                ("Random Forest", 3),
                ("XGBoost", 4),
                ("XGBoost", 1)
            ]
        );
    }

    #[test]
    fn test_template_sections_present() {
        let text = generate(&[record(7, 1.0, "Gradient Boosting", 1)], 5);
        assert!(text.contains("- Feature 7 (Model: Gradient Boosting)"));
        for heading in [
            "Targeted Marketing Campaigns",
            "Personalized Communication",
            "Feature Monitoring and Updates",
            "Enhanced Data Collection",
        ] {
            assert!(text.contains(heading));
        }
    }

    #[test]
    fn test_named_bullets() {
        let names = vec!["age".to_string(), "income".to_string()];
        let text = generate_named(&[record(1, 1.0, "Random Forest", 1)], 3, &names);
        assert!(text.contains("- Feature 1 [income] (Model: Random Forest)"));
    }
}
