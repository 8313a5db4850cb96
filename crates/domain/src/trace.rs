use serde::Serialize;

/// Structured trace events emitted across all StreamRelay crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionResolved {
        user_id: String,
        found: bool,
    },
    SessionUpserted {
        user_id: String,
        conversation_id: String,
    },
    SessionExpired {
        user_id: String,
    },
    TurnQueued {
        user_id: String,
        depth: usize,
    },
    TurnStarted {
        user_id: String,
        card_id: String,
        has_conversation: bool,
    },
    TurnFinished {
        user_id: String,
        outcome: String,
        answer_chars: usize,
        updates_dispatched: usize,
        duration_ms: u64,
    },
    BackendRequest {
        backend: String,
        streaming: bool,
        status: u16,
        duration_ms: u64,
    },
    CardUpdate {
        card_id: String,
        stage: String,
        ok: bool,
        duration_ms: u64,
    },
    AuditRecorded {
        user_id: String,
        ok: bool,
    },
    PermissionChecked {
        user_id: String,
        level: i64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sr_event");
    }
}
