use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::pin::Pin;

/// A boxed async stream, used for backend streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Event kind
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The `event` tag of a backend streaming record.
///
/// Unknown tags are kept verbatim in [`EventKind::Other`] so newer backend
/// versions never break decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Message,
    AgentMessage,
    MessageEnd,
    MessageReplace,
    Error,
    WorkflowStarted,
    WorkflowFinished,
    NodeStarted,
    NodeFinished,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Message => "message",
            Self::AgentMessage => "agent_message",
            Self::MessageEnd => "message_end",
            Self::MessageReplace => "message_replace",
            Self::Error => "error",
            Self::WorkflowStarted => "workflow_started",
            Self::WorkflowFinished => "workflow_finished",
            Self::NodeStarted => "node_started",
            Self::NodeFinished => "node_finished",
            Self::Other(s) => s,
        }
    }

    /// `message_end` and `error` end a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MessageEnd | Self::Error)
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "message" => Self::Message,
            "agent_message" => Self::AgentMessage,
            "message_end" => Self::MessageEnd,
            "message_replace" => Self::MessageReplace,
            "error" => Self::Error,
            "workflow_started" => Self::WorkflowStarted,
            "workflow_finished" => Self::WorkflowFinished,
            "node_started" => Self::NodeStarted,
            "node_finished" => Self::NodeFinished,
            _ => Self::Other(s),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming event
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One decoded record from the backend's line-framed stream.
///
/// Only `event`, `answer` and `conversation_id` drive the pipeline; the rest
/// is carried for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingEvent {
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub conversation_id: String,
    /// Answer fragment for `message` / `agent_message`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
    /// Error text on `error` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: i64,
}

/// Explicit JSON `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl StreamingEvent {
    /// Build a bare event of the given kind.
    pub fn new(event: EventKind) -> Self {
        Self {
            event,
            task_id: None,
            workflow_run_id: None,
            message_id: None,
            conversation_id: String::new(),
            answer: String::new(),
            message: None,
            code: None,
            data: serde_json::Value::Null,
            metadata: serde_json::Value::Null,
            created_at: 0,
        }
    }

    /// A `message` event carrying one answer fragment.
    pub fn message(fragment: impl Into<String>) -> Self {
        Self {
            answer: fragment.into(),
            ..Self::new(EventKind::Message)
        }
    }

    /// A `message_end` event for the given conversation.
    pub fn message_end(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            ..Self::new(EventKind::MessageEnd)
        }
    }

    /// An `error` event with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(EventKind::Error)
        }
    }

    /// Best available description of an `error` event.
    pub fn error_text(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(msg)) => format!("{code}: {msg}"),
            (None, Some(msg)) => msg.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "backend reported an error".into(),
        }
    }
}
