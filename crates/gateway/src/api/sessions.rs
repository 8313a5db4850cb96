use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::state::AppState;

/// `GET /v1/sessions/:user_id`: the user's live conversation id.
pub async fn get_session(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    match state.sessions.get(&user_id) {
        Some(conversation_id) => Json(serde_json::json!({
            "user_id": user_id,
            "conversation_id": conversation_id,
        }))
        .into_response(),
        None => super::error_response(StatusCode::NOT_FOUND, "no live session for user"),
    }
}
