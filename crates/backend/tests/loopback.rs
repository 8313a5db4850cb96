//! Exercises the HTTP client against a local axum server speaking the
//! `/chat-messages` wire format.

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::Value;

use sr_backend::{ChatMessagesClient, ChatRequest, ConversationBackend};
use sr_domain::config::BackendConfig;
use sr_domain::error::Error;
use sr_domain::stream::EventKind;

async fn chat_messages(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer app-loopback");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }

    let query = body["query"].as_str().unwrap_or_default().to_string();
    if query == "boom" {
        return (
            StatusCode::BAD_REQUEST,
            r#"{"code":"invalid_param","message":"boom"}"#,
        )
            .into_response();
    }

    let conversation = body["conversation_id"].as_str().unwrap_or("c-new").to_string();

    match body["response_mode"].as_str() {
        Some("streaming") => {
            let lines = format!(
                "data: {{\"event\":\"message\",\"answer\":\"echo:\"}}\n\n\
                 data: {{\"event\":\"message\",\"answer\":\"{query}\"}}\n\n\
                 data: {{\"event\":\"message_end\",\"conversation_id\":\"{conversation}\"}}\n\n"
            );
            Response::new(Body::from(lines))
        }
        _ => Json(serde_json::json!({
            "event": "message",
            "answer": format!("echo:{query}"),
            "conversation_id": conversation,
            "message_id": "m1",
        }))
        .into_response(),
    }
}

async fn spawn_backend() -> String {
    let app = Router::new().route("/v1/chat-messages", post(chat_messages));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1")
}

fn client(base_url: String, key: &str) -> ChatMessagesClient {
    let cfg = BackendConfig {
        base_url,
        api_key: Some(key.into()),
        ..BackendConfig::default()
    };
    ChatMessagesClient::new(&cfg).unwrap()
}

#[tokio::test]
async fn streaming_turn_decodes_all_events() {
    let backend = client(spawn_backend().await, "app-loopback");
    let req = ChatRequest::new("u1", "hi").with_conversation(Some("c7".into()));

    let events: Vec<_> = backend
        .stream_chat(&req)
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .map(|e| e.unwrap())
        .collect();

    assert_eq!(events.len(), 3);
    let answer: String = events
        .iter()
        .filter(|e| e.event == EventKind::Message)
        .map(|e| e.answer.as_str())
        .collect();
    assert_eq!(answer, "echo:hi");
    assert_eq!(events[2].event, EventKind::MessageEnd);
    assert_eq!(events[2].conversation_id, "c7");
}

#[tokio::test]
async fn blocking_turn_returns_answer() {
    let backend = client(spawn_backend().await, "app-loopback");
    let answer = backend
        .block_chat(&ChatRequest::new("u1", "ping"))
        .await
        .unwrap();
    assert_eq!(answer.answer, "echo:ping");
    assert_eq!(answer.conversation_id, "c-new");
    assert_eq!(answer.message_id.as_deref(), Some("m1"));
}

#[tokio::test]
async fn error_status_fails_before_streaming() {
    let backend = client(spawn_backend().await, "app-loopback");
    let err = match backend.stream_chat(&ChatRequest::new("u1", "boom")).await {
        Ok(_) => panic!("expected an error"),
        Err(e) => e,
    };
    match err {
        Error::Backend { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("invalid_param"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn wrong_key_is_rejected() {
    let backend = client(spawn_backend().await, "app-wrong");
    let err = backend
        .block_chat(&ChatRequest::new("u1", "hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Backend { status: 401, .. }));
    assert!(err.is_backend());
}
