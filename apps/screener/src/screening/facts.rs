/// Fact extraction — best-effort candidate name and contact address from raw résumé text.
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const PLACEHOLDER_NAME: &str = "Candidate";

/// Free-text scanner: finds addresses embedded anywhere in a document.
static EMBEDDED_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("embedded address pattern is valid")
});

/// Anchored check for addresses typed in by an operator.
static OPERATOR_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("operator address pattern is valid")
});

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern is valid"));

/// Facts about the candidate behind one document. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub display_name: String,
    pub contact_address: Option<String>,
    pub source_document_id: String,
}

/// Builds the profile for a document from its extracted text.
pub fn build_candidate(source_document_id: &str, text: &str) -> CandidateProfile {
    CandidateProfile {
        display_name: extract_name(text),
        contact_address: extract_contact(text),
        source_document_id: source_document_id.to_string(),
    }
}

/// First e-mail-shaped substring in document order, returned verbatim.
pub fn extract_contact(text: &str) -> Option<String> {
    EMBEDDED_ADDRESS.find(text).map(|m| m.as_str().to_string())
}

/// First token of the first non-empty line, punctuation stripped.
/// Falls back to `PLACEHOLDER_NAME`.
pub fn extract_name(text: &str) -> String {
    let Some(first_line) = text.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return PLACEHOLDER_NAME.to_string();
    };

    let cleaned = PUNCTUATION.replace_all(first_line, "");
    cleaned
        .split_whitespace()
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| PLACEHOLDER_NAME.to_string())
}

/// Full-string address check, used only for operator-supplied destinations.
pub fn is_valid_address(address: &str) -> bool {
    OPERATOR_ADDRESS.is_match(address)
}
