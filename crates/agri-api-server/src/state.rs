use std::sync::Arc;

use crate::config::Settings;
use crate::knowledge::KnowledgeBase;
use crate::services::GeminiService;
use crate::session::SessionStore;

/// Application state shared across handlers. Owned by the composition root
/// in `main` and injected by reference; nothing here is process-global.
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub knowledge_base: Arc<KnowledgeBase>,
    pub session_store: Arc<SessionStore>,
    /// None when the provider credential was never configured; AI endpoints
    /// then answer 503 instead of panicking mid-request.
    pub gemini: Option<Arc<GeminiService>>,
}
