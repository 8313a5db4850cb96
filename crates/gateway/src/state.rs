use std::sync::Arc;

use sr_backend::ConversationBackend;
use sr_domain::config::Config;
use sr_sessions::SessionStore;

use crate::runtime::TurnQueue;
use crate::services::PermissionCheck;
use crate::surface::CardSurface;

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services**: config, backend, chat surface
/// - **Conversation state**: sessions, turn queue
/// - **Gatekeeping**: permission lookup, API token hash
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub backend: Arc<dyn ConversationBackend>,
    pub surface: Arc<dyn CardSurface>,

    // ── Conversation state ────────────────────────────────────────────
    pub sessions: Arc<SessionStore>,
    pub queue: TurnQueue,

    // ── Gatekeeping ───────────────────────────────────────────────────
    /// `None` when permission checks are disabled.
    pub permission: Option<Arc<dyn PermissionCheck>>,
    /// SHA-256 digest of the API bearer token, read once at startup.
    /// `None` means no token is configured (dev mode).
    pub api_token_hash: Option<Vec<u8>>,
}
