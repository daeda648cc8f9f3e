/// Scorer — matches a taxonomy against document text.
///
/// Counting rule: a keyword group contributes at most one hit, however many of
/// its surface forms match and however often they occur. Verbose documents and
/// bilingual résumés that list both "inglês" and "english" score the same as a
/// terse one.
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::screening::taxonomy::{KeywordGroup, Taxonomy};

/// Distinct groups found inside one category of a categorized taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryHits {
    pub category: String,
    pub hits: usize,
    pub labels: Vec<String>,
}

/// Result of scoring one document. Recomputed per document, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Canonical labels with at least one matching surface form.
    pub labels_found: BTreeSet<String>,
    /// Number of distinct groups found (== `labels_found.len()`).
    pub total_hits: usize,
    /// Per-category counts in priority order. Empty for a flat taxonomy.
    pub category_hits: Vec<CategoryHits>,
}

impl MatchResult {
    /// Hit count for a category, 0 if the category is unknown.
    pub fn hits_for(&self, category: &str) -> usize {
        self.category_hits
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.hits)
            .unwrap_or(0)
    }
}

/// Scores `text` against `taxonomy`. Pure and deterministic.
pub fn score(text: &str, taxonomy: &Taxonomy) -> MatchResult {
    let lowered = text.to_lowercase();

    match taxonomy {
        Taxonomy::Flat { groups } => {
            let labels_found: BTreeSet<String> = found_labels(groups, &lowered).collect();
            MatchResult {
                total_hits: labels_found.len(),
                labels_found,
                category_hits: vec![],
            }
        }
        Taxonomy::Categorized { categories } => {
            let mut labels_found = BTreeSet::new();
            let mut category_hits = Vec::with_capacity(categories.len());

            for category in categories {
                let labels: Vec<String> = found_labels(&category.groups, &lowered).collect();
                labels_found.extend(labels.iter().cloned());
                category_hits.push(CategoryHits {
                    category: category.name.clone(),
                    hits: labels.len(),
                    labels,
                });
            }

            MatchResult {
                total_hits: labels_found.len(),
                labels_found,
                category_hits,
            }
        }
    }
}

fn found_labels<'a>(
    groups: &'a [KeywordGroup],
    lowered: &'a str,
) -> impl Iterator<Item = String> + 'a {
    groups
        .iter()
        .filter(move |g| g.is_found_in(lowered))
        .map(|g| g.canonical_label().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::taxonomy::Category;

    fn group(label: &str, forms: &[&str]) -> KeywordGroup {
        KeywordGroup::new(label, forms).unwrap()
    }

    fn flat(groups: Vec<KeywordGroup>) -> Taxonomy {
        Taxonomy::flat(groups).unwrap()
    }

    #[test]
    fn test_synonyms_count_once() {
        let taxonomy = flat(vec![group(
            "Inglês",
            &["inglês", "english", "fluent english", "inglês fluente"],
        )]);
        let result = score("Inglês fluente. Fluent English. English, english.", &taxonomy);
        assert_eq!(result.total_hits, 1);
        assert!(result.labels_found.contains("Inglês"));
    }

    #[test]
    fn test_repeated_mentions_count_once() {
        let taxonomy = flat(vec![group("Python", &["python"]), group("Git", &["git"])]);
        let result = score("python python PYTHON python", &taxonomy);
        assert_eq!(result.total_hits, 1);
        assert_eq!(result.labels_found.len(), 1);
    }

    #[test]
    fn test_total_hits_equals_distinct_labels() {
        let taxonomy = flat(vec![
            group("Python", &["python"]),
            group("APIs", &["apis", "api", "rest", "graphql"]),
            group("Containers", &["docker", "kubernetes"]),
            group("Jira", &["jira"]),
        ]);
        let text = "Python, REST and GraphQL APIs; Docker and Kubernetes. More Python.";
        let result = score(text, &taxonomy);
        assert_eq!(result.total_hits, result.labels_found.len());
        assert_eq!(result.total_hits, 3);
        assert!(!result.labels_found.contains("Jira"));
    }

    #[test]
    fn test_case_insensitive() {
        let taxonomy = flat(vec![group("Kubernetes", &["Kubernetes"])]);
        assert_eq!(score("KUBERNETES operator", &taxonomy).total_hits, 1);
    }

    #[test]
    fn test_reaction_does_not_match_react() {
        let taxonomy = flat(vec![group("React", &["react"])]);
        assert_eq!(score("A chemical reaction", &taxonomy).total_hits, 0);
        assert_eq!(score("React.js rocks", &taxonomy).total_hits, 1);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let taxonomy = flat(vec![
            group("Python", &["python"]),
            group("Cloud", &["aws", "azure", "gcp"]),
            group("Scrum", &["scrum", "sprint"]),
        ]);
        let text = "Scrum master on AWS and Azure, writing Python every sprint.";
        assert_eq!(score(text, &taxonomy), score(text, &taxonomy));
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let taxonomy = flat(vec![group("Python", &["python"])]);
        let result = score("", &taxonomy);
        assert_eq!(result.total_hits, 0);
        assert!(result.labels_found.is_empty());
    }

    #[test]
    fn test_categorized_counts_per_category() {
        let taxonomy = Taxonomy::categorized(vec![
            Category {
                name: "excellent".to_string(),
                groups: vec![group("SAP", &["sap"]), group("PP", &["pp"])],
            },
            Category {
                name: "good".to_string(),
                groups: vec![group("ERP", &["erp"]), group("TOTVS", &["totvs"])],
            },
            Category {
                name: "medium".to_string(),
                groups: vec![group("Excel", &["excel"])],
            },
        ])
        .unwrap();

        let result = score("ERP rollout on TOTVS, reporting in Excel. ERP again.", &taxonomy);
        assert_eq!(result.hits_for("excellent"), 0);
        assert_eq!(result.hits_for("good"), 2);
        assert_eq!(result.hits_for("medium"), 1);
        assert_eq!(result.hits_for("unknown"), 0);
        assert_eq!(result.total_hits, 3);
        assert_eq!(
            result.category_hits.iter().map(|c| c.category.as_str()).collect::<Vec<_>>(),
            vec!["excellent", "good", "medium"]
        );
        assert_eq!(result.category_hits[1].labels, vec!["ERP", "TOTVS"]);
    }
}
