//! Chat surfaces: where cards and replies are rendered.
//!
//! A turn sends one card, refreshes it while the answer streams in and
//! finishes it with the complete answer.  Blocking output modes skip the
//! card and reply once.

pub mod bridge;
pub mod console;

use std::time::Instant;

use serde::{Deserialize, Serialize};

use sr_domain::error::Result;
use sr_domain::trace::TraceEvent;

pub use bridge::HttpBridgeSurface;
pub use console::ConsoleSurface;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reply target
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    #[default]
    Direct,
    Group,
}

impl ChatType {
    /// Numeric code used by the question log (1 direct, 2 group).
    pub fn code(self) -> u8 {
        match self {
            Self::Direct => 1,
            Self::Group => 2,
        }
    }

    /// Parse the front-end's `conversation_type` field (`"2"` is a group).
    pub fn from_conversation_type(raw: &str) -> Self {
        if raw == "2" {
            Self::Group
        } else {
            Self::Direct
        }
    }
}

/// Where a turn's output is delivered.  Opaque to the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub chat_type: ChatType,
    /// Group conversation for group cards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_conversation_id: Option<String>,
    /// Recipient of direct cards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
    /// Short-lived webhook for plain replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_webhook: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Card content
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStage {
    /// Partial answer, more to come.
    Streaming,
    /// Complete answer.
    Final,
    /// The turn failed after the card was sent.
    Failed,
}

impl CardStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Final => "final",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardContent {
    pub text: String,
    pub stage: CardStage,
}

impl CardContent {
    pub fn streaming(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stage: CardStage::Streaming,
        }
    }

    pub fn final_answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stage: CardStage::Final,
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stage: CardStage::Failed,
        }
    }
}

/// Render card data in the front-end's standard card layout.  Streaming
/// cards carry `title` in the header; finished cards drop the header.
pub fn render_card(title: Option<&str>, text: &str) -> serde_json::Value {
    let mut card = serde_json::json!({
        "config": { "autoLayout": true, "enableForward": true },
        "contents": [
            { "type": "markdown", "text": text, "id": "answer" }
        ],
    });
    if let Some(title) = title {
        card["header"] = serde_json::json!({
            "title": { "type": "text", "text": title },
        });
    }
    card
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Surface trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
pub trait CardSurface: Send + Sync {
    /// Post a new, empty streaming card identified by `card_id`.
    async fn send_card(&self, card_id: &str, reply: &ReplyTarget) -> Result<()>;

    /// Replace the content of an existing card.
    async fn update_card(&self, card_id: &str, content: &CardContent) -> Result<()>;

    async fn reply_text(&self, reply: &ReplyTarget, text: &str) -> Result<()>;

    async fn reply_markdown(&self, reply: &ReplyTarget, title: &str, text: &str) -> Result<()>;
}

/// Update a card, logging the outcome.  Failures are never retried.
pub async fn push_update(surface: &dyn CardSurface, card_id: &str, content: &CardContent) -> bool {
    let started = Instant::now();
    let result = surface.update_card(card_id, content).await;
    let ok = result.is_ok();

    TraceEvent::CardUpdate {
        card_id: card_id.to_owned(),
        stage: content.stage.as_str().to_owned(),
        ok,
        duration_ms: started.elapsed().as_millis() as u64,
    }
    .emit();

    if let Err(e) = result {
        tracing::warn!(card_id, stage = content.stage.as_str(), error = %e, "card update failed");
    }
    ok
}
