// Screening core: taxonomy, scoring, tiering, fact extraction and message wording.
// Everything here is pure; I/O lives in extraction, dispatch and the orchestrator.

pub mod classifier;
pub mod composer;
pub mod facts;
pub mod profile;
pub mod scorer;
pub mod taxonomy;
