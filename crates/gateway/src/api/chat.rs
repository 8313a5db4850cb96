//! `POST /v1/chat`: one blocking turn, answered in the HTTP response.
//!
//! Shares the session store with the streaming pipeline, so a user's
//! conversation continues whichever entry point they use.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use sr_backend::ChatRequest;
use sr_domain::error::Error;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub user_id: String,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub conversation_id: String,
}

pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatBody>) -> Response {
    let query = body.query.trim();
    if body.user_id.is_empty() || query.is_empty() {
        return super::error_response(StatusCode::BAD_REQUEST, "user_id and query are required");
    }

    let conversation_id = state.sessions.get(&body.user_id);
    let req = ChatRequest::new(body.user_id.clone(), query).with_conversation(conversation_id);

    match state.backend.block_chat(&req).await {
        Ok(answer) => {
            if !answer.conversation_id.is_empty() {
                state.sessions.upsert(&body.user_id, &answer.conversation_id);
            }
            Json(ChatResponse {
                answer: answer.answer,
                conversation_id: answer.conversation_id,
            })
            .into_response()
        }
        Err(e) => {
            tracing::warn!(user_id = %body.user_id, error = %e, "blocking chat failed");
            backend_error_response(&e)
        }
    }
}

/// Map a backend failure to a gateway status.
pub(crate) fn backend_error_response(e: &Error) -> Response {
    let status = match e {
        Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    super::error_response(status, e.to_string())
}
