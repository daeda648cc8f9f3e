use std::sync::Arc;

use crate::orchestrator::Screener;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Loaded once at startup; every request screens against the same profile.
    pub screener: Arc<Screener>,
}
