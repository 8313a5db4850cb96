//! Inbound contract: the normalized message the transport adapter posts.
//!
//! `POST /v1/inbound` runs the gatekeeping steps in order:
//! - permission check (when enabled)
//! - supported message type check
//! - query extraction (`text`, or the voice `recognition`)
//!
//! and then hands the turn off according to `frontend.output_mode`.
//! Rejections are replied to the user through the surface and still answer
//! `200` so the adapter does not retry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use sr_backend::ChatRequest;
use sr_domain::config::OutputMode;

use crate::runtime::TurnJob;
use crate::services::permission::is_allowed;
use crate::state::AppState;
use crate::surface::{ChatType, ReplyTarget};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    /// `"text"`, `"audio"`, `"picture"`, ...
    pub msgtype: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_nick: String,
    #[serde(default)]
    pub sender_staff_id: Option<String>,
    /// `"1"` direct, `"2"` group.
    #[serde(default)]
    pub conversation_type: String,
    /// Group conversation id (group chats only).
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub session_webhook: Option<String>,
    #[serde(default)]
    pub text: String,
    /// Speech-to-text result for voice messages.
    #[serde(default)]
    pub recognition: String,
}

impl InboundEnvelope {
    /// The user's query, trimmed.  Voice messages use their transcription.
    pub fn query(&self) -> &str {
        if self.msgtype == "audio" {
            self.recognition.trim()
        } else {
            self.text.trim()
        }
    }

    pub fn reply_target(&self) -> ReplyTarget {
        let chat_type = ChatType::from_conversation_type(&self.conversation_type);
        ReplyTarget {
            chat_type,
            open_conversation_id: match chat_type {
                ChatType::Group => self.conversation_id.clone(),
                ChatType::Direct => None,
            },
            staff_id: self.sender_staff_id.clone(),
            session_webhook: self.session_webhook.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InboundResponse {
    pub queued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl InboundResponse {
    fn queued() -> Self {
        Self {
            queued: true,
            rejected: None,
            answer: None,
        }
    }

    fn rejected(reason: &'static str) -> Self {
        Self {
            queued: false,
            rejected: Some(reason),
            answer: None,
        }
    }

    fn answered(answer: String) -> Self {
        Self {
            queued: false,
            rejected: None,
            answer: Some(answer),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/inbound
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn inbound(State(state): State<AppState>, Json(body): Json<InboundEnvelope>) -> Response {
    let frontend = &state.config.frontend;
    let reply = body.reply_target();

    // ── 1. Permission ─────────────────────────────────────────────
    let mut permission = 0;
    if let Some(check) = &state.permission {
        match check.level(&body.sender_id, &body.sender_nick).await {
            Ok(level) if is_allowed(level) => permission = level,
            Ok(level) => {
                tracing::info!(user_id = %body.sender_id, permission_level = level, "message blocked: no permission");
                send_text(&state, &reply, &frontend.no_permission_text).await;
                return Json(InboundResponse::rejected("no_permission")).into_response();
            }
            Err(e) => {
                tracing::error!(user_id = %body.sender_id, error = %e, "permission lookup failed");
                send_text(&state, &reply, &frontend.internal_error_text).await;
                return Json(InboundResponse::rejected("permission_unavailable")).into_response();
            }
        }
    }

    // ── 2. Message type ───────────────────────────────────────────
    if !frontend.supports(&body.msgtype) {
        tracing::info!(user_id = %body.sender_id, msgtype = %body.msgtype, "unsupported message type");
        send_text(&state, &reply, &frontend.unsupported_text).await;
        return Json(InboundResponse::rejected("unsupported_type")).into_response();
    }

    // ── 3. Query ──────────────────────────────────────────────────
    let query = body.query().to_owned();
    if query.is_empty() {
        tracing::debug!(user_id = %body.sender_id, "empty query ignored");
        return Json(InboundResponse::rejected("empty_query")).into_response();
    }

    // ── 4. Hand off ───────────────────────────────────────────────
    match frontend.output_mode {
        OutputMode::Stream => {
            let mut job = TurnJob::new(body.sender_id.clone(), query, reply);
            job.user_name = body.sender_nick.clone();
            job.permission = permission;

            match state.queue.submit(job).await {
                Ok(()) => (StatusCode::ACCEPTED, Json(InboundResponse::queued())).into_response(),
                Err(e) => {
                    tracing::error!(user_id = %body.sender_id, error = %e, "turn queue rejected job");
                    super::error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
                }
            }
        }
        mode @ (OutputMode::Text | OutputMode::Markdown) => {
            answer_blocking(&state, &body, &reply, query, mode).await
        }
    }
}

/// Blocking output modes: one backend call, one reply.
async fn answer_blocking(
    state: &AppState,
    body: &InboundEnvelope,
    reply: &ReplyTarget,
    query: String,
    mode: OutputMode,
) -> Response {
    let conversation_id = state.sessions.get(&body.sender_id);
    let req = ChatRequest::new(body.sender_id.clone(), query).with_conversation(conversation_id);

    let answer = match state.backend.block_chat(&req).await {
        Ok(answer) => answer,
        Err(e) => {
            tracing::warn!(user_id = %body.sender_id, error = %e, "blocking answer failed");
            send_text(state, reply, &state.config.frontend.internal_error_text).await;
            return super::chat::backend_error_response(&e);
        }
    };

    if !answer.conversation_id.is_empty() {
        state.sessions.upsert(&body.sender_id, &answer.conversation_id);
    }

    let sent = match mode {
        OutputMode::Markdown => {
            state
                .surface
                .reply_markdown(reply, &state.config.frontend.card_title, &answer.answer)
                .await
        }
        _ => state.surface.reply_text(reply, &answer.answer).await,
    };
    if let Err(e) = sent {
        tracing::warn!(user_id = %body.sender_id, error = %e, "reply failed");
    }

    Json(InboundResponse::answered(answer.answer)).into_response()
}

async fn send_text(state: &AppState, reply: &ReplyTarget, text: &str) {
    if let Err(e) = state.surface.reply_text(reply, text).await {
        tracing::warn!(error = %e, "reply failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: serde_json::Value) -> InboundEnvelope {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn voice_messages_use_recognition() {
        let env = envelope(serde_json::json!({
            "msgtype": "audio",
            "sender_id": "u1",
            "text": "ignored",
            "recognition": "  what time is it  ",
        }));
        assert_eq!(env.query(), "what time is it");

        let env = envelope(serde_json::json!({
            "msgtype": "text",
            "sender_id": "u1",
            "text": " hi ",
        }));
        assert_eq!(env.query(), "hi");
    }

    #[test]
    fn group_messages_target_the_conversation() {
        let env = envelope(serde_json::json!({
            "msgtype": "text",
            "sender_id": "u1",
            "sender_staff_id": "s1",
            "conversation_type": "2",
            "conversation_id": "cid-9",
        }));
        let target = env.reply_target();
        assert_eq!(target.chat_type, ChatType::Group);
        assert_eq!(target.open_conversation_id.as_deref(), Some("cid-9"));

        let env = envelope(serde_json::json!({
            "msgtype": "text",
            "sender_id": "u1",
            "sender_staff_id": "s1",
            "conversation_type": "1",
            "conversation_id": "cid-9",
        }));
        let target = env.reply_target();
        assert_eq!(target.chat_type, ChatType::Direct);
        assert_eq!(target.open_conversation_id, None);
        assert_eq!(target.staff_id.as_deref(), Some("s1"));
    }
}
