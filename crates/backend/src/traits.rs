use serde::{Deserialize, Serialize};

use sr_domain::error::Result;
use sr_domain::stream::{BoxStream, StreamingEvent};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One user turn sent to the conversational backend.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// The user's message.
    pub query: String,
    /// Stable user identity on the backend side.
    pub user: String,
    /// Existing conversation to continue.  `None` starts a new one.
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    pub fn new(user: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user: user.into(),
            conversation_id: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: Option<String>) -> Self {
        self.conversation_id = conversation_id.filter(|c| !c.is_empty());
        self
    }
}

/// Response body of a blocking call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockingAnswer {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: i64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backend trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A conversational backend that answers chat turns.
#[async_trait::async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Open a streaming turn.  Errors here mean no event was produced.
    async fn stream_chat(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamingEvent>>>;

    /// Run a turn to completion and return the whole answer.
    async fn block_chat(&self, req: &ChatRequest) -> Result<BlockingAnswer>;

    /// Identifier used in logs and trace events.
    fn backend_id(&self) -> &str;
}
