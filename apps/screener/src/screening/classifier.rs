/// Classifier — maps a `MatchResult` onto one ordered tier.
///
/// Two policies, selected by taxonomy shape:
/// - `FlatCount`: highest tier of an ascending threshold ladder that `total_hits` reaches.
/// - `CategoryPriority`: first category (in priority order) whose hit count meets its
///   minimum wins, even when a later category scored more hits.
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::screening::scorer::MatchResult;
use crate::screening::taxonomy::Taxonomy;

pub const NO_MATCH_JUSTIFICATION: &str =
    "No characteristics from the keyword taxonomy were found in the résumé.";

/// One position in the tier order. Rank 0 is the lowest tier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tier {
    pub rank: usize,
    pub label: String,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label.to_uppercase())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TierThreshold {
    pub tier: Tier,
    pub min_hits: usize,
}

/// Ascending threshold table for the flat-count policy.
#[derive(Debug, Clone, Serialize)]
pub struct TierLadder {
    steps: Vec<TierThreshold>,
}

impl TierLadder {
    /// Builds a ladder from `(label, min_hits)` pairs, lowest tier first.
    ///
    /// The first threshold must be 0 so every document lands somewhere, and
    /// thresholds must be strictly increasing.
    pub fn new<S: Into<String>>(steps: Vec<(S, usize)>) -> Result<Self, ConfigError> {
        if steps.is_empty() {
            return Err(ConfigError::InvalidLadder("ladder has no tiers".to_string()));
        }

        let mut labels = HashSet::new();
        let mut built: Vec<TierThreshold> = Vec::with_capacity(steps.len());
        for (rank, (label, min_hits)) in steps.into_iter().enumerate() {
            let label = label.into();
            if label.trim().is_empty() {
                return Err(ConfigError::InvalidLadder(format!("tier {rank} has an empty label")));
            }
            if !labels.insert(label.to_lowercase()) {
                return Err(ConfigError::InvalidLadder(format!("tier '{label}' is listed twice")));
            }
            match built.last() {
                None if min_hits != 0 => {
                    return Err(ConfigError::InvalidLadder(format!(
                        "lowest tier '{label}' must start at 0 hits, got {min_hits}"
                    )));
                }
                Some(prev) if min_hits <= prev.min_hits => {
                    return Err(ConfigError::InvalidLadder(format!(
                        "tier '{label}' threshold {min_hits} must exceed '{}' threshold {}",
                        prev.tier.label, prev.min_hits
                    )));
                }
                _ => {}
            }
            built.push(TierThreshold {
                tier: Tier { rank, label },
                min_hits,
            });
        }

        Ok(Self { steps: built })
    }

    pub fn steps(&self) -> &[TierThreshold] {
        &self.steps
    }

    /// Highest step whose threshold is met (inclusive).
    fn step_for(&self, hits: usize) -> &TierThreshold {
        self.steps
            .iter()
            .rev()
            .find(|s| hits >= s.min_hits)
            .unwrap_or(&self.steps[0])
    }
}

/// One category's entry in the priority list.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryRule {
    pub category: String,
    pub tier: Tier,
    pub min_hits: usize,
}

/// Priority-ordered category rules plus the tier for documents no rule accepts.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryPolicy {
    rules: Vec<CategoryRule>,
    fallback: Tier,
}

impl CategoryPolicy {
    /// `rules` are `(category, tier_label, min_hits)` from most to least desirable.
    /// Tier ranks follow that order; the fallback tier is rank 0.
    pub fn new(
        rules: Vec<(String, String, usize)>,
        fallback_label: &str,
    ) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            return Err(ConfigError::InvalidCategoryRules("no categories configured".to_string()));
        }
        if fallback_label.trim().is_empty() {
            return Err(ConfigError::InvalidCategoryRules(
                "fallback tier label is empty".to_string(),
            ));
        }

        let mut categories = HashSet::new();
        let mut tier_labels = HashSet::from([fallback_label.to_lowercase()]);
        let count = rules.len();
        let mut built = Vec::with_capacity(count);

        for (index, (category, tier_label, min_hits)) in rules.into_iter().enumerate() {
            if !categories.insert(category.to_lowercase()) {
                return Err(ConfigError::InvalidCategoryRules(format!(
                    "category '{category}' has more than one rule"
                )));
            }
            if !tier_labels.insert(tier_label.to_lowercase()) {
                return Err(ConfigError::InvalidCategoryRules(format!(
                    "tier '{tier_label}' is used twice"
                )));
            }
            if min_hits == 0 {
                return Err(ConfigError::InvalidCategoryRules(format!(
                    "category '{category}' needs a minimum of at least 1 hit"
                )));
            }
            built.push(CategoryRule {
                category,
                tier: Tier {
                    rank: count - index,
                    label: tier_label,
                },
                min_hits,
            });
        }

        Ok(Self {
            rules: built,
            fallback: Tier {
                rank: 0,
                label: fallback_label.to_string(),
            },
        })
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn fallback(&self) -> &Tier {
        &self.fallback
    }

    /// Replaces every rule's minimum (operator "minimum keyword count").
    pub fn with_min_hits(mut self, min_hits: usize) -> Result<Self, ConfigError> {
        if min_hits == 0 {
            return Err(ConfigError::InvalidCategoryRules(
                "minimum keyword count must be at least 1".to_string(),
            ));
        }
        for rule in &mut self.rules {
            rule.min_hits = min_hits;
        }
        Ok(self)
    }
}

/// Classification strategy, selected by taxonomy shape.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ClassificationPolicy {
    FlatCount(TierLadder),
    CategoryPriority(CategoryPolicy),
}

impl ClassificationPolicy {
    /// All tiers, lowest first.
    pub fn tiers(&self) -> Vec<Tier> {
        match self {
            ClassificationPolicy::FlatCount(ladder) => {
                ladder.steps.iter().map(|s| s.tier.clone()).collect()
            }
            ClassificationPolicy::CategoryPriority(policy) => {
                let mut tiers = vec![policy.fallback.clone()];
                tiers.extend(policy.rules.iter().rev().map(|r| r.tier.clone()));
                tiers
            }
        }
    }

    pub fn lowest(&self) -> Tier {
        match self {
            ClassificationPolicy::FlatCount(ladder) => ladder.steps[0].tier.clone(),
            ClassificationPolicy::CategoryPriority(policy) => policy.fallback.clone(),
        }
    }

    /// Checks that the policy fits the taxonomy shape: flat ↔ ladder,
    /// categorized ↔ exactly one rule per category.
    pub fn check_shape(&self, taxonomy: &Taxonomy) -> Result<(), ConfigError> {
        match (self, taxonomy) {
            (ClassificationPolicy::FlatCount(_), Taxonomy::Flat { .. }) => Ok(()),
            (ClassificationPolicy::CategoryPriority(policy), Taxonomy::Categorized { .. }) => {
                let names = taxonomy.category_names();
                for name in &names {
                    if !policy.rules.iter().any(|r| r.category == *name) {
                        return Err(ConfigError::InvalidCategoryRules(format!(
                            "category '{name}' has no rule"
                        )));
                    }
                }
                for rule in &policy.rules {
                    if !names.contains(&rule.category.as_str()) {
                        return Err(ConfigError::InvalidCategoryRules(format!(
                            "rule for unknown category '{}'",
                            rule.category
                        )));
                    }
                }
                Ok(())
            }
            (ClassificationPolicy::FlatCount(_), Taxonomy::Categorized { .. }) => Err(
                ConfigError::InvalidCategoryRules(
                    "a categorized taxonomy needs category-priority rules".to_string(),
                ),
            ),
            (ClassificationPolicy::CategoryPriority(_), Taxonomy::Flat { .. }) => Err(
                ConfigError::InvalidLadder("a flat taxonomy needs a tier ladder".to_string()),
            ),
        }
    }
}

/// Chosen tier plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub tier: Tier,
    pub justification: String,
}

/// Classifies a scored document. Never fails: zero hits is the lowest tier.
pub fn classify(result: &MatchResult, policy: &ClassificationPolicy) -> Classification {
    if result.total_hits == 0 {
        return Classification {
            tier: policy.lowest(),
            justification: NO_MATCH_JUSTIFICATION.to_string(),
        };
    }

    match policy {
        ClassificationPolicy::FlatCount(ladder) => classify_flat(result, ladder),
        ClassificationPolicy::CategoryPriority(rules) => classify_by_priority(result, rules),
    }
}

fn classify_flat(result: &MatchResult, ladder: &TierLadder) -> Classification {
    let step = ladder.step_for(result.total_hits);
    let labels: Vec<&str> = result.labels_found.iter().map(String::as_str).collect();

    Classification {
        tier: step.tier.clone(),
        justification: format!(
            "Found {} matching characteristic{} ({}); tier {} starts at {}.",
            result.total_hits,
            plural(result.total_hits),
            labels.join(", "),
            step.tier,
            step.min_hits
        ),
    }
}

fn classify_by_priority(result: &MatchResult, policy: &CategoryPolicy) -> Classification {
    for rule in &policy.rules {
        let Some(hits) = result.category_hits.iter().find(|c| c.category == rule.category) else {
            continue;
        };
        if hits.hits >= rule.min_hits {
            return Classification {
                tier: rule.tier.clone(),
                justification: format!(
                    "Found {} keyword{} from the '{}' category ({}), meeting its minimum of {}.",
                    hits.hits,
                    plural(hits.hits),
                    rule.category,
                    hits.labels.join(", "),
                    rule.min_hits
                ),
            };
        }
    }

    let tally: Vec<String> = policy
        .rules
        .iter()
        .map(|r| format!("{} {}/{}", r.category, result.hits_for(&r.category), r.min_hits))
        .collect();

    Classification {
        tier: policy.fallback.clone(),
        justification: format!(
            "No category reached its minimum keyword count ({}).",
            tally.join(", ")
        ),
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
