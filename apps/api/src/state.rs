use std::sync::Arc;

use crate::quiz::bank::QuestionBank;
use crate::quiz::insights::InsightGenerator;
use crate::quiz::session::SessionRegistry;
use crate::store::MenteeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Immutable, validated at startup, shared read-only by every session.
    pub bank: Arc<QuestionBank>,
    /// Pluggable insight generator. Production: LlmInsightGenerator.
    pub generator: Arc<dyn InsightGenerator>,
    /// Durable home for generated results.
    pub store: Arc<dyn MenteeStore>,
    /// Per-user session state machines and ephemeral result cache.
    pub sessions: Arc<SessionRegistry>,
}
