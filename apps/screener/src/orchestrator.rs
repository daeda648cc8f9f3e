/// Orchestrator — runs the screening pipeline over one document or a folder of them.
///
/// extract text → facts → score → classify → compose → dispatch → record.
///
/// Documents are processed strictly one after another. A document that cannot be
/// read becomes a `DocumentFailure`; a message that cannot be sent becomes an
/// outcome with `dispatched = false`. Neither stops the batch.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::dispatch::{Dispatcher, OutgoingMail};
use crate::errors::ConfigError;
use crate::extraction::{
    DocumentFormat, ExtractionError, PdfTextExtractor, PlainTextExtractor, TextExtractor,
};
use crate::screening::classifier::{classify, Tier};
use crate::screening::composer::{ComposedMessage, MessageComposer};
use crate::screening::facts::{build_candidate, is_valid_address, CandidateProfile};
use crate::screening::profile::ScreeningProfile;
use crate::screening::scorer::{score, MatchResult};

/// Everything recorded about one processed document. Never mutated after assembly.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub candidate: CandidateProfile,
    pub match_result: MatchResult,
    pub tier: Tier,
    pub justification: String,
    pub message: ComposedMessage,
    /// Address the message was (or would have been) sent to.
    pub recipient: Option<String>,
    pub dispatched: bool,
    pub dispatch_error: Option<String>,
}

/// A document the pipeline could not read.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub source_document_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<AnalysisOutcome>,
    pub failures: Vec<DocumentFailure>,
    /// Documents attempted (analyzed + failed).
    pub processed: usize,
    pub dispatched: usize,
}

impl BatchReport {
    pub fn tally_line(&self) -> String {
        format!(
            "Finished: {} résumé(s) processed, {} analyzed, {} unreadable, {} e-mail(s) sent",
            self.processed,
            self.outcomes.len(),
            self.failures.len(),
            self.dispatched
        )
    }
}

/// The pure part of a run: what the pipeline concluded before any dispatch.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub candidate: CandidateProfile,
    pub match_result: MatchResult,
    pub tier: Tier,
    pub justification: String,
    pub message: ComposedMessage,
}

pub struct Screener {
    profile: ScreeningProfile,
    composer: MessageComposer,
    pdf_extractor: Arc<dyn TextExtractor + Send + Sync>,
    dispatcher: Arc<dyn Dispatcher>,
    sender: String,
    recipient_override: Option<String>,
}

impl Screener {
    /// `signature` closes every message; `sender` is the From address.
    pub fn new(
        profile: ScreeningProfile,
        signature: &str,
        sender: &str,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let composer = MessageComposer::new(profile.templates.clone(), signature);
        Self {
            profile,
            composer,
            pdf_extractor: Arc::new(PdfTextExtractor),
            dispatcher,
            sender: sender.to_string(),
            recipient_override: None,
        }
    }

    /// Sends every message to `address` instead of the address mined from the document.
    pub fn with_recipient(mut self, address: &str) -> Result<Self, ConfigError> {
        let address = address.trim();
        if !is_valid_address(address) {
            return Err(ConfigError::InvalidAddress(address.to_string()));
        }
        self.recipient_override = Some(address.to_string());
        Ok(self)
    }

    pub fn with_pdf_extractor(mut self, extractor: Box<dyn TextExtractor + Send + Sync>) -> Self {
        self.pdf_extractor = Arc::from(extractor);
        self
    }

    pub fn profile(&self) -> &ScreeningProfile {
        &self.profile
    }

    /// Scores, classifies and words the decision for already-extracted text.
    pub fn analyze_text(&self, document_id: &str, text: &str) -> Analysis {
        let candidate = build_candidate(document_id, text);
        let match_result = score(text, &self.profile.taxonomy);
        let classification = classify(&match_result, &self.profile.policy);
        let message =
            self.composer
                .compose(&classification.tier, &classification.justification, &candidate);

        Analysis {
            candidate,
            match_result,
            tier: classification.tier,
            justification: classification.justification,
            message,
        }
    }

    /// Runs the parser on the blocking pool so a large PDF never stalls the runtime.
    pub async fn extract_blocking(
        &self,
        document_id: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ExtractionError> {
        let extractor = self.extractor_for(document_id, &bytes)?;
        tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
            .await
            .map_err(|e| ExtractionError::Unreadable(format!("extraction task failed: {e}")))?
    }

    fn extractor_for(
        &self,
        document_id: &str,
        bytes: &[u8],
    ) -> Result<Arc<dyn TextExtractor + Send + Sync>, ExtractionError> {
        let extractor: Arc<dyn TextExtractor + Send + Sync> =
            match DocumentFormat::detect(document_id, bytes)? {
                DocumentFormat::Pdf => self.pdf_extractor.clone(),
                DocumentFormat::PlainText => Arc::new(PlainTextExtractor),
            };
        Ok(extractor)
    }

    /// Full pipeline over in-memory document bytes.
    /// `recipient` (already validated by the caller) beats the configured override,
    /// which beats the mined contact address.
    pub async fn process_bytes(
        &self,
        document_id: &str,
        bytes: &[u8],
        recipient: Option<&str>,
    ) -> Result<AnalysisOutcome, ExtractionError> {
        let text = self.extract_blocking(document_id, bytes.to_vec()).await?;
        info!("{}: extracted {} characters", document_id, text.chars().count());

        let analysis = self.analyze_text(document_id, &text);
        info!(
            "{}: candidate {}, tier {}, {} unique characteristic(s) [{}]",
            document_id,
            analysis.candidate.display_name,
            analysis.tier,
            analysis.match_result.total_hits,
            analysis
                .match_result
                .labels_found
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );

        let recipient = recipient
            .map(str::to_string)
            .or_else(|| self.recipient_override.clone())
            .or_else(|| analysis.candidate.contact_address.clone());

        Ok(self.deliver(analysis, recipient).await)
    }

    /// Reads a file and runs the pipeline on it.
    pub async fn process_file(&self, path: &Path) -> Result<AnalysisOutcome, ExtractionError> {
        let document_id = document_id_for(path);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ExtractionError::Unreadable(format!("{}: {e}", path.display())))?;
        self.process_bytes(&document_id, &bytes, None).await
    }

    /// Processes every path in order. Per-document failures are recorded, never propagated.
    pub async fn run_batch(&self, paths: &[PathBuf]) -> BatchReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::new();
        let mut failures = Vec::new();

        for (index, path) in paths.iter().enumerate() {
            info!("Résumé {} of {}: {}", index + 1, paths.len(), path.display());
            match self.process_file(path).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    failures.push(DocumentFailure {
                        source_document_id: document_id_for(path),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let dispatched = outcomes.iter().filter(|o| o.dispatched).count();
        BatchReport {
            started_at,
            finished_at: Utc::now(),
            processed: outcomes.len() + failures.len(),
            dispatched,
            outcomes,
            failures,
        }
    }

    async fn deliver(&self, analysis: Analysis, recipient: Option<String>) -> AnalysisOutcome {
        let (dispatched, dispatch_error) = match &recipient {
            None => {
                warn!(
                    "{}: no contact address found, message not sent",
                    analysis.candidate.source_document_id
                );
                (false, None)
            }
            Some(to) => {
                let mail = OutgoingMail {
                    from: self.sender.clone(),
                    to: to.clone(),
                    subject: analysis.message.subject.clone(),
                    body: analysis.message.body.clone(),
                };
                match self.dispatcher.send(&mail).await {
                    Ok(sent) => {
                        if sent {
                            info!("{}: message sent to {}", analysis.candidate.source_document_id, to);
                        }
                        (sent, None)
                    }
                    Err(e) => {
                        warn!(
                            "{}: failed to send message to {}: {}",
                            analysis.candidate.source_document_id, to, e
                        );
                        (false, Some(e.to_string()))
                    }
                }
            }
        };

        AnalysisOutcome {
            candidate: analysis.candidate,
            match_result: analysis.match_result,
            tier: analysis.tier,
            justification: analysis.justification,
            message: analysis.message,
            recipient,
            dispatched,
            dispatch_error,
        }
    }
}

/// Readable documents directly inside `dir`, sorted by file name.
pub fn collect_documents(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && DocumentFormat::from_extension(p).is_some())
        .collect();
    paths.sort();
    Ok(paths)
}

fn document_id_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatchError;
    use crate::screening::facts::PLACEHOLDER_NAME;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every message; fails for addresses in `reject`.
    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<OutgoingMail>>,
        reject: Vec<String>,
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn send(&self, mail: &OutgoingMail) -> Result<bool, DispatchError> {
            if self.reject.contains(&mail.to) {
                return Err(DispatchError::Rejected {
                    status: 550,
                    message: "mailbox unavailable".to_string(),
                });
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(true)
        }
    }

    struct FixedPdf(&'static str);

    impl TextExtractor for FixedPdf {
        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
            Ok(vec![self.0.to_string()])
        }
    }

    fn screener(dispatcher: Arc<RecordingDispatcher>) -> Screener {
        Screener::new(
            ScreeningProfile::preset("ai-developer").unwrap(),
            "Ana Recruiter",
            "talent@company.com",
            dispatcher,
        )
    }

    const STRONG_RESUME: &str = "Carla Mendes\ncarla.mendes@example.com\n\
        Backend engineer: Python, REST APIs, Docker, Kubernetes, AWS.\n\
        Built LLM agents with LangChain, prompt engineering and structured outputs.\n\
        Git, code review, Scrum, Jira. Fluent English.";

    #[tokio::test]
    async fn test_python_rest_english_end_to_end() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let s = screener(dispatcher.clone());
        let text = "Experienced in Python and REST APIs. Fluent English.";
        let outcome = s.process_bytes("cv.txt", text.as_bytes(), None).await.unwrap();

        assert_eq!(outcome.match_result.total_hits, 3);
        assert_eq!(outcome.tier.label, "medium");
        assert_eq!(outcome.candidate.display_name, "Experienced");
        assert_eq!(outcome.candidate.contact_address, None);
        assert!(!outcome.dispatched);
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_is_lowest_tier_and_not_dispatched() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let s = screener(dispatcher.clone());
        let outcome = s.process_bytes("empty.txt", b"", None).await.unwrap();

        assert_eq!(outcome.match_result.total_hits, 0);
        assert_eq!(outcome.tier.rank, 0);
        assert_eq!(outcome.candidate.display_name, PLACEHOLDER_NAME);
        assert_eq!(outcome.candidate.contact_address, None);
        assert_eq!(outcome.recipient, None);
        assert!(!outcome.dispatched);
        assert!(outcome.dispatch_error.is_none());
    }

    #[tokio::test]
    async fn test_mined_contact_receives_message() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let s = screener(dispatcher.clone());
        let outcome = s
            .process_bytes("carla.txt", STRONG_RESUME.as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(outcome.tier.label, "excellent");
        assert!(outcome.dispatched);
        let sent = dispatcher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "carla.mendes@example.com");
        assert_eq!(sent[0].from, "talent@company.com");
        assert!(sent[0].body.starts_with("Dear Carla,"));
        assert!(sent[0].subject.contains("Ana Recruiter"));
    }

    #[tokio::test]
    async fn test_operator_recipient_overrides_mined_contact() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let s = screener(dispatcher.clone())
            .with_recipient("hiring@company.com")
            .unwrap();
        let outcome = s
            .process_bytes("carla.txt", STRONG_RESUME.as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(outcome.recipient.as_deref(), Some("hiring@company.com"));
        assert_eq!(outcome.candidate.contact_address.as_deref(), Some("carla.mendes@example.com"));
        assert_eq!(dispatcher.sent.lock().unwrap()[0].to, "hiring@company.com");

        // Per-call recipient wins over the configured override.
        let outcome = s
            .process_bytes("carla.txt", STRONG_RESUME.as_bytes(), Some("lead@company.com"))
            .await
            .unwrap();
        assert_eq!(outcome.recipient.as_deref(), Some("lead@company.com"));
    }

    #[test]
    fn test_invalid_operator_recipient_is_config_error() {
        let err = screener(Arc::new(RecordingDispatcher::default()))
            .with_recipient("not-an-address")
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_recorded_not_raised() {
        let dispatcher = Arc::new(RecordingDispatcher {
            reject: vec!["carla.mendes@example.com".to_string()],
            ..Default::default()
        });
        let s = screener(dispatcher);
        let outcome = s
            .process_bytes("carla.txt", STRONG_RESUME.as_bytes(), None)
            .await
            .unwrap();

        assert_eq!(outcome.tier.label, "excellent");
        assert!(!outcome.dispatched);
        assert!(outcome.dispatch_error.unwrap().contains("550"));
    }

    #[tokio::test]
    async fn test_pdf_bytes_use_pdf_extractor() {
        let s = screener(Arc::new(RecordingDispatcher::default()))
            .with_pdf_extractor(Box::new(FixedPdf("Bruno Costa\nKubernetes and Docker")));
        let outcome = s.process_bytes("upload", b"%PDF-1.4 fake", None).await.unwrap();
        assert_eq!(outcome.candidate.display_name, "Bruno");
        assert!(outcome.match_result.labels_found.contains("Containers"));
        assert_eq!(outcome.match_result.total_hits, 1);
    }

    struct PanickingPdf;

    impl TextExtractor for PanickingPdf {
        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
            panic!("parser bug");
        }
    }

    #[tokio::test]
    async fn test_extraction_runs_off_the_runtime_thread() {
        struct ThreadReporter;

        impl TextExtractor for ThreadReporter {
            fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
                Ok(vec![format!("{:?}", std::thread::current().id())])
            }
        }

        let runtime_thread = format!("{:?}", std::thread::current().id());
        let s = screener(Arc::new(RecordingDispatcher::default()))
            .with_pdf_extractor(Box::new(ThreadReporter));
        let worker_thread = s.extract_blocking("cv.pdf", b"%PDF-1.4".to_vec()).await.unwrap();
        assert_ne!(worker_thread, runtime_thread);
    }

    #[tokio::test]
    async fn test_extractor_panic_becomes_unreadable() {
        let s = screener(Arc::new(RecordingDispatcher::default()))
            .with_pdf_extractor(Box::new(PanickingPdf));
        let err = s.process_bytes("cv.pdf", b"%PDF-1.4", None).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable(msg) if msg.contains("extraction task failed")));
    }

    #[tokio::test]
    async fn test_batch_continues_past_unreadable_documents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_carla.txt"), STRONG_RESUME).unwrap();
        std::fs::write(dir.path().join("b_broken.pdf"), b"definitely not a pdf").unwrap();
        std::fs::write(dir.path().join("c_empty.txt"), "").unwrap();
        std::fs::write(dir.path().join("d_binary.txt"), [0xff_u8, 0xfe, 0xfd]).unwrap();
        std::fs::write(dir.path().join("notes.docx"), b"ignored").unwrap();

        let paths = collect_documents(dir.path()).unwrap();
        let names: Vec<String> = paths.iter().map(|p| document_id_for(p)).collect();
        assert_eq!(names, vec!["a_carla.txt", "b_broken.pdf", "c_empty.txt", "d_binary.txt"]);

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let report = screener(dispatcher.clone()).run_batch(&paths).await;

        assert_eq!(report.processed, 4);
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.dispatched, 1);
        assert_eq!(report.failures[0].source_document_id, "b_broken.pdf");
        assert_eq!(report.failures[1].source_document_id, "d_binary.txt");
        assert_eq!(report.outcomes[0].candidate.source_document_id, "a_carla.txt");
        assert!(report.finished_at >= report.started_at);
        assert!(report.tally_line().contains("4 résumé(s) processed"));
        assert!(report.tally_line().contains("1 e-mail(s) sent"));
    }

    #[tokio::test]
    async fn test_missing_file_is_a_failure() {
        let report = screener(Arc::new(RecordingDispatcher::default()))
            .run_batch(&[PathBuf::from("/nonexistent/cv.pdf")])
            .await;
        assert_eq!(report.processed, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_category_profile_pipeline() {
        let s = Screener::new(
            ScreeningProfile::preset("erp-consultant").unwrap(),
            "HR",
            "hr@company.com",
            Arc::new(RecordingDispatcher::default()),
        );
        let analysis = s.analyze_text(
            "erp.txt",
            "Consultor ERP\nIntegração TOTVS e ERP, relatórios em Excel e Oracle.",
        );
        assert_eq!(analysis.tier.label, "good");
        assert_eq!(analysis.candidate.display_name, "Consultor");
        assert!(analysis.message.body.contains("GOOD level"));
    }
}
