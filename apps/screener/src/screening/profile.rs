/// Screening profiles — taxonomy, classification policy and message templates
/// loaded together from one JSON document.
///
/// The `shape` field selects the taxonomy shape and, with it, the policy:
/// `"flat"` carries a tier `ladder`, `"categorized"` carries priority-ordered
/// `categories` with per-category minimums.
use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::ConfigError;
use crate::screening::classifier::{CategoryPolicy, ClassificationPolicy, TierLadder};
use crate::screening::composer::{MessageTemplate, TemplateSet};
use crate::screening::taxonomy::{Category, KeywordGroup, Taxonomy};

/// Minimum distinct keywords a category needs when the profile does not say.
pub const DEFAULT_CATEGORY_MIN_HITS: usize = 2;

const AI_DEVELOPER_PROFILE: &str = include_str!("../../profiles/ai-developer.json");
const ERP_CONSULTANT_PROFILE: &str = include_str!("../../profiles/erp-consultant.json");

/// Built-in profiles selectable by name.
pub const PRESETS: &[&str] = &["ai-developer", "erp-consultant"];

#[derive(Debug, Deserialize)]
struct GroupSpec {
    label: String,
    surface_forms: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TierSpec {
    tier: String,
    min_hits: usize,
}

#[derive(Debug, Deserialize)]
struct CategorySpec {
    name: String,
    /// Tier awarded by this category; defaults to the category name.
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    min_hits: Option<usize>,
    groups: Vec<GroupSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
enum ProfileFile {
    Flat {
        groups: Vec<GroupSpec>,
        ladder: Vec<TierSpec>,
        #[serde(default)]
        templates: BTreeMap<String, MessageTemplate>,
    },
    Categorized {
        categories: Vec<CategorySpec>,
        #[serde(default = "default_fallback_tier")]
        fallback_tier: String,
        #[serde(default = "default_min_hits")]
        min_hits: usize,
        #[serde(default)]
        templates: BTreeMap<String, MessageTemplate>,
    },
}

fn default_fallback_tier() -> String {
    "low".to_string()
}

fn default_min_hits() -> usize {
    DEFAULT_CATEGORY_MIN_HITS
}

/// Everything the pipeline needs to score, classify and word a decision.
/// Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct ScreeningProfile {
    pub name: String,
    pub taxonomy: Taxonomy,
    pub policy: ClassificationPolicy,
    pub templates: TemplateSet,
}

impl ScreeningProfile {
    /// Assembles a profile, checking that the policy matches the taxonomy shape.
    pub fn new(
        name: impl Into<String>,
        taxonomy: Taxonomy,
        policy: ClassificationPolicy,
        templates: TemplateSet,
    ) -> Result<Self, ConfigError> {
        policy.check_shape(&taxonomy)?;

        let name = name.into();
        let tiers = policy.tiers();
        for tier in templates.missing_for(&tiers) {
            warn!(
                "Profile '{}': tier '{}' has no message template, the generic one will be used",
                name, tier.label
            );
        }

        Ok(Self {
            name,
            taxonomy,
            policy,
            templates,
        })
    }

    /// Looks up a built-in profile.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let json = match name {
            "ai-developer" => AI_DEVELOPER_PROFILE,
            "erp-consultant" => ERP_CONSULTANT_PROFILE,
            other => return Err(ConfigError::UnknownPreset(other.to_string())),
        };
        Self::from_json(name, json, name)
    }

    /// Reads a profile file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: origin.clone(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| origin.clone());
        let profile = Self::from_json(&name, &json, &origin)?;
        info!(
            "Loaded profile '{}' from {} ({} keyword groups)",
            profile.name,
            origin,
            profile.taxonomy.group_count()
        );
        Ok(profile)
    }

    /// Parses a profile document. `origin` only labels parse errors.
    pub fn from_json(name: &str, json: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: ProfileFile = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;

        match file {
            ProfileFile::Flat {
                groups,
                ladder,
                templates,
            } => {
                let taxonomy = Taxonomy::flat(build_groups(groups)?)?;
                let ladder = TierLadder::new(
                    ladder.into_iter().map(|t| (t.tier, t.min_hits)).collect(),
                )?;
                Self::new(
                    name,
                    taxonomy,
                    ClassificationPolicy::FlatCount(ladder),
                    TemplateSet::with_overrides(templates),
                )
            }
            ProfileFile::Categorized {
                categories,
                fallback_tier,
                min_hits,
                templates,
            } => {
                let mut rules = Vec::with_capacity(categories.len());
                let mut built = Vec::with_capacity(categories.len());
                for spec in categories {
                    let tier = spec.tier.unwrap_or_else(|| spec.name.clone());
                    rules.push((spec.name.clone(), tier, spec.min_hits.unwrap_or(min_hits)));
                    built.push(Category {
                        name: spec.name,
                        groups: build_groups(spec.groups)?,
                    });
                }
                let taxonomy = Taxonomy::categorized(built)?;
                let policy = CategoryPolicy::new(rules, &fallback_tier)?;
                Self::new(
                    name,
                    taxonomy,
                    ClassificationPolicy::CategoryPriority(policy),
                    TemplateSet::with_overrides(templates),
                )
            }
        }
    }

    /// Applies the operator's minimum keyword count to every category.
    /// A flat profile keeps its ladder; the override is ignored with a warning.
    pub fn with_min_hits(self, min_hits: usize) -> Result<Self, ConfigError> {
        let Self {
            name,
            taxonomy,
            policy,
            templates,
        } = self;

        let policy = match policy {
            ClassificationPolicy::CategoryPriority(rules) => {
                ClassificationPolicy::CategoryPriority(rules.with_min_hits(min_hits)?)
            }
            flat @ ClassificationPolicy::FlatCount(_) => {
                warn!(
                    "Profile '{}' uses a tier ladder; minimum keyword count {} ignored",
                    name, min_hits
                );
                flat
            }
        };

        Ok(Self {
            name,
            taxonomy,
            policy,
            templates,
        })
    }
}

fn build_groups(specs: Vec<GroupSpec>) -> Result<Vec<KeywordGroup>, ConfigError> {
    specs
        .iter()
        .map(|g| KeywordGroup::new(&g.label, &g.surface_forms))
        .collect()
}
