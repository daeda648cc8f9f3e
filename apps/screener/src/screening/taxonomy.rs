/// Keyword taxonomy — canonical skill labels and the surface forms that count for them.
///
/// A taxonomy is built once at startup and never mutated afterwards. Every group
/// compiles its surface forms into a single word-bounded matcher at construction,
/// so scoring a document never touches the regex compiler.
use std::collections::{HashMap, HashSet};

use regex::Regex;

use crate::errors::ConfigError;

/// One canonical label plus every surface form (synonyms, translations) that counts for it.
#[derive(Debug, Clone)]
pub struct KeywordGroup {
    canonical_label: String,
    surface_forms: Vec<String>,
    matcher: Regex,
}

impl KeywordGroup {
    /// Builds a group. Surface forms are trimmed and lower-cased; an empty form
    /// or an empty form list is a `ConfigError`.
    pub fn new<S: AsRef<str>>(canonical_label: &str, surface_forms: &[S]) -> Result<Self, ConfigError> {
        if surface_forms.is_empty() {
            return Err(ConfigError::EmptyGroup {
                label: canonical_label.to_string(),
            });
        }

        let mut forms: Vec<String> = Vec::with_capacity(surface_forms.len());
        for form in surface_forms {
            let form = form.as_ref().trim().to_lowercase();
            if form.is_empty() {
                return Err(ConfigError::EmptySurfaceForm {
                    label: canonical_label.to_string(),
                });
            }
            if !forms.contains(&form) {
                forms.push(form);
            }
        }

        let matcher = compile_matcher(&forms)?;

        Ok(Self {
            canonical_label: canonical_label.to_string(),
            surface_forms: forms,
            matcher,
        })
    }

    pub fn canonical_label(&self) -> &str {
        &self.canonical_label
    }

    pub fn surface_forms(&self) -> &[String] {
        &self.surface_forms
    }

    /// True if any surface form occurs as a whole word in `lowered_text`.
    /// The caller lower-cases the text once per document.
    pub fn is_found_in(&self, lowered_text: &str) -> bool {
        self.matcher.is_match(lowered_text)
    }
}

/// Half-boundaries instead of `\b` so forms that start or end with a
/// non-word character ("c++", "ci/cd", ".net") are still delimited correctly.
fn compile_matcher(forms: &[String]) -> Result<Regex, ConfigError> {
    let alternation = forms
        .iter()
        .map(|f| regex::escape(f))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r"\b{{start-half}}(?:{alternation})\b{{end-half}}");
    Regex::new(&pattern).map_err(|source| ConfigError::Pattern {
        form: forms.join(", "),
        source,
    })
}

/// A named partition of the taxonomy (e.g. "excellent", "good", "medium").
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub groups: Vec<KeywordGroup>,
}

/// The two supported taxonomy shapes. The shape decides which
/// classification policy applies.
#[derive(Debug, Clone)]
pub enum Taxonomy {
    /// One flat group list, compared against a single tier ladder.
    Flat { groups: Vec<KeywordGroup> },
    /// Named categories in priority order (most desirable first).
    Categorized { categories: Vec<Category> },
}

impl Taxonomy {
    pub fn flat(groups: Vec<KeywordGroup>) -> Result<Self, ConfigError> {
        check_unique(groups.iter())?;
        Ok(Taxonomy::Flat { groups })
    }

    pub fn categorized(categories: Vec<Category>) -> Result<Self, ConfigError> {
        let mut names = HashSet::new();
        for category in &categories {
            if !names.insert(category.name.to_lowercase()) {
                return Err(ConfigError::DuplicateCategory(category.name.clone()));
            }
            if category.groups.is_empty() {
                return Err(ConfigError::EmptyCategory(category.name.clone()));
            }
        }
        check_unique(categories.iter().flat_map(|c| c.groups.iter()))?;
        Ok(Taxonomy::Categorized { categories })
    }

    /// All groups in declaration order, across categories.
    pub fn groups(&self) -> Box<dyn Iterator<Item = &KeywordGroup> + '_> {
        match self {
            Taxonomy::Flat { groups } => Box::new(groups.iter()),
            Taxonomy::Categorized { categories } => {
                Box::new(categories.iter().flat_map(|c| c.groups.iter()))
            }
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups().count()
    }

    /// Category names in priority order; empty for the flat shape.
    pub fn category_names(&self) -> Vec<&str> {
        match self {
            Taxonomy::Flat { .. } => vec![],
            Taxonomy::Categorized { categories } => {
                categories.iter().map(|c| c.name.as_str()).collect()
            }
        }
    }
}

/// Canonical labels are unique and every surface form belongs to exactly one group.
fn check_unique<'a>(groups: impl Iterator<Item = &'a KeywordGroup>) -> Result<(), ConfigError> {
    let mut labels = HashSet::new();
    let mut owners: HashMap<&str, &str> = HashMap::new();

    for group in groups {
        if !labels.insert(group.canonical_label()) {
            return Err(ConfigError::DuplicateLabel(group.canonical_label().to_string()));
        }
        for form in group.surface_forms() {
            if let Some(first) = owners.insert(form.as_str(), group.canonical_label()) {
                return Err(ConfigError::DuplicateSurfaceForm {
                    form: form.clone(),
                    first: first.to_string(),
                    second: group.canonical_label().to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(label: &str, forms: &[&str]) -> KeywordGroup {
        KeywordGroup::new(label, forms).unwrap()
    }

    #[test]
    fn test_surface_forms_are_lowercased_and_deduplicated() {
        let g = group("APIs", &["APIs", "api", "API"]);
        assert_eq!(g.surface_forms(), &["apis".to_string(), "api".to_string()]);
        assert_eq!(g.canonical_label(), "APIs");
    }

    #[test]
    fn test_empty_surface_form_is_config_error() {
        let err = KeywordGroup::new("Python", &["python", "  "]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySurfaceForm { .. }));
    }

    #[test]
    fn test_group_without_forms_is_config_error() {
        let forms: [&str; 0] = [];
        let err = KeywordGroup::new("Python", &forms).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyGroup { .. }));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let err = Taxonomy::flat(vec![group("Git", &["git"]), group("Git", &["commit"])]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateLabel(label) if label == "Git"));
    }

    #[test]
    fn test_surface_form_shared_by_two_groups_rejected() {
        let err = Taxonomy::flat(vec![
            group("APIs", &["api", "rest"]),
            group("REST", &["rest"]),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSurfaceForm { form, .. } if form == "rest"));
    }

    #[test]
    fn test_duplicate_label_across_categories_rejected() {
        let err = Taxonomy::categorized(vec![
            Category {
                name: "excellent".to_string(),
                groups: vec![group("SAP", &["sap"])],
            },
            Category {
                name: "good".to_string(),
                groups: vec![group("SAP", &["sap erp"])],
            },
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateLabel(_)));
    }

    #[test]
    fn test_empty_category_rejected() {
        let err = Taxonomy::categorized(vec![Category {
            name: "good".to_string(),
            groups: vec![],
        }])
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCategory(_)));
    }

    #[test]
    fn test_word_boundary_match() {
        let g = group("React", &["react"]);
        assert!(g.is_found_in("react.js rocks"));
        assert!(!g.is_found_in("chemical reaction"));
    }

    #[test]
    fn test_api_does_not_match_inside_rapid() {
        let g = group("APIs", &["api"]);
        assert!(!g.is_found_in("rapid delivery"));
        assert!(g.is_found_in("public api design"));
    }

    #[test]
    fn test_forms_with_symbols_match_as_words() {
        let g = group("CI/CD", &["ci/cd", "c++"]);
        assert!(g.is_found_in("built ci/cd pipelines"));
        assert!(g.is_found_in("modern c++, rust"));
        assert!(!g.is_found_in("abci/cdx"));
    }

    #[test]
    fn test_multi_word_and_accented_forms() {
        let g = group("Orquestração", &["orquestração", "orchestration"]);
        assert!(g.is_found_in("experiência com orquestração de agentes"));
        let g = group("Inglês", &["fluent english"]);
        assert!(g.is_found_in("fluent english."));
        assert!(!g.is_found_in("fluent englishman"));
    }

    #[test]
    fn test_groups_iterates_categories_in_order() {
        let taxonomy = Taxonomy::categorized(vec![
            Category {
                name: "excellent".to_string(),
                groups: vec![group("SAP", &["sap"])],
            },
            Category {
                name: "medium".to_string(),
                groups: vec![group("Excel", &["excel"]), group("Oracle", &["oracle"])],
            },
        ])
        .unwrap();
        let labels: Vec<&str> = taxonomy.groups().map(|g| g.canonical_label()).collect();
        assert_eq!(labels, vec!["SAP", "Excel", "Oracle"]);
        assert_eq!(taxonomy.group_count(), 3);
        assert_eq!(taxonomy.category_names(), vec!["excellent", "medium"]);
    }
}
