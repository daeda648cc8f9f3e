/// Message composer — renders the tier-specific notification sent to a candidate.
///
/// Templates are plain data keyed by tier label. Adding a tier means adding a
/// template, never a new branch here.
///
/// Placeholders: `{candidate_name}`, `{tier}`, `{justification}`, `{document}`, `{signature}`.
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::screening::classifier::Tier;
use crate::screening::facts::CandidateProfile;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

pub const DEFAULT_SUBJECT: &str = "Result of your résumé analysis - {signature}";

const EXCELLENT_BODY: &str = "Dear {candidate_name},

CONGRATULATIONS! You reached the {tier} level of our candidate ranking.

Your profile showed excellent alignment with the requirements of this position.
{justification}

You are moving straight to the third stage of the selection process.
Our team will contact you shortly.

Kind regards,
{signature}";

const GOOD_BODY: &str = "Dear {candidate_name},

Good news! You reached the {tier} level of our candidate ranking.

Your profile showed good alignment with the requirements of this position.
{justification}

You are invited to the second stage of the selection process.
We will share the next steps soon.

Kind regards,
{signature}";

const MEDIUM_BODY: &str = "Dear {candidate_name},

You reached the {tier} level of our candidate ranking.

Your profile showed partial alignment with the requirements of this position.
{justification}

You have been selected for the second stage of the selection process.
We will be in touch soon.

Kind regards,
{signature}";

const LOW_BODY: &str = "Dear {candidate_name},

Thank you for taking part in our selection process.

Your profile did not show enough alignment with the technical requirements of this position
and was ranked at the {tier} level.
{justification}

We wish you every success in your career.

Kind regards,
{signature}";

const FALLBACK_BODY: &str = "Dear {candidate_name},

Your résumé ({document}) was ranked at the {tier} level.
{justification}

Kind regards,
{signature}";

/// Subject and body pair for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    #[serde(default = "default_subject")]
    pub subject: String,
    pub body: String,
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

impl MessageTemplate {
    pub fn new(subject: &str, body: &str) -> Self {
        Self {
            subject: subject.to_string(),
            body: body.to_string(),
        }
    }
}

/// A rendered notification, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedMessage {
    pub subject: String,
    pub body: String,
}

/// Templates keyed by lower-cased tier label, plus a generic fallback.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    by_tier: BTreeMap<String, MessageTemplate>,
    fallback: MessageTemplate,
}

impl Default for TemplateSet {
    fn default() -> Self {
        let by_tier = [
            ("excellent", EXCELLENT_BODY),
            ("good", GOOD_BODY),
            ("medium", MEDIUM_BODY),
            ("low", LOW_BODY),
        ]
        .into_iter()
        .map(|(tier, body)| (tier.to_string(), MessageTemplate::new(DEFAULT_SUBJECT, body)))
        .collect();

        Self {
            by_tier,
            fallback: MessageTemplate::new(DEFAULT_SUBJECT, FALLBACK_BODY),
        }
    }
}

impl TemplateSet {
    /// Defaults overlaid with `overrides` (keys are tier labels, any case).
    pub fn with_overrides(overrides: BTreeMap<String, MessageTemplate>) -> Self {
        let mut set = Self::default();
        for (tier, template) in overrides {
            set.by_tier.insert(tier.to_lowercase(), template);
        }
        set
    }

    pub fn get(&self, tier: &Tier) -> &MessageTemplate {
        self.by_tier
            .get(&tier.label.to_lowercase())
            .unwrap_or(&self.fallback)
    }

    /// Tiers that will be rendered with the generic fallback template.
    pub fn missing_for<'a>(&self, tiers: &'a [Tier]) -> Vec<&'a Tier> {
        tiers
            .iter()
            .filter(|t| !self.by_tier.contains_key(&t.label.to_lowercase()))
            .collect()
    }
}

/// Pure renderer: no I/O, no failure modes.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    templates: TemplateSet,
    signature: String,
}

impl MessageComposer {
    pub fn new(templates: TemplateSet, signature: impl Into<String>) -> Self {
        Self {
            templates,
            signature: signature.into(),
        }
    }

    pub fn compose(
        &self,
        tier: &Tier,
        justification: &str,
        candidate: &CandidateProfile,
    ) -> ComposedMessage {
        let template = self.templates.get(tier);
        let tier_label = tier.to_string();
        // Single pass: substituted values are never scanned for placeholders again.
        let render = |text: &str| {
            PLACEHOLDER
                .replace_all(text, |caps: &Captures| match &caps[1] {
                    "candidate_name" => candidate.display_name.clone(),
                    "tier" => tier_label.clone(),
                    "document" => candidate.source_document_id.clone(),
                    "signature" => self.signature.clone(),
                    "justification" => justification.to_string(),
                    _ => caps[0].to_string(),
                })
                .into_owned()
        };

        ComposedMessage {
            subject: render(&template.subject),
            body: render(&template.body),
        }
    }
}
