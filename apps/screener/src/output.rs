/// Console rendering of screening results.
use anyhow::Result;

use crate::orchestrator::{AnalysisOutcome, BatchReport};

/// Renders outcomes either as one summary line per résumé or as pretty JSON.
pub struct Formatter {
    json: bool,
}

impl Formatter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn format_outcome(&self, outcome: &AnalysisOutcome) -> Result<String> {
        if self.json {
            return Ok(serde_json::to_string_pretty(outcome)?);
        }

        let mut out = summary_line(outcome);
        out.push_str(&format!("\n  {}", outcome.justification));
        match (&outcome.recipient, outcome.dispatched) {
            (Some(to), true) => out.push_str(&format!("\n  Sent to {to}")),
            (Some(to), false) => match &outcome.dispatch_error {
                Some(e) => out.push_str(&format!("\n  Not sent to {to}: {e}")),
                None => out.push_str(&format!("\n  Not sent to {to} (dry run)")),
            },
            (None, _) => out.push_str("\n  No contact address found"),
        }
        Ok(out)
    }

    pub fn format_report(&self, report: &BatchReport) -> Result<String> {
        if self.json {
            return Ok(serde_json::to_string_pretty(report)?);
        }

        let mut lines: Vec<String> = report.outcomes.iter().map(summary_line).collect();
        lines.extend(
            report
                .failures
                .iter()
                .map(|f| format!("{} - unreadable: {}", f.source_document_id, f.reason)),
        );
        if lines.is_empty() {
            lines.push("No résumés found.".to_string());
        }
        lines.push(String::new());
        lines.push(report.tally_line());
        Ok(lines.join("\n"))
    }
}

/// `Name (TIER) - N unique characteristics - file`
fn summary_line(outcome: &AnalysisOutcome) -> String {
    format!(
        "{} ({}) - {} unique characteristics - {}",
        outcome.candidate.display_name,
        outcome.tier,
        outcome.match_result.total_hits,
        outcome.candidate.source_document_id
    )
}
