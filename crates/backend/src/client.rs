//! HTTP client for the `/chat-messages` conversational API.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use sr_domain::config::BackendConfig;
use sr_domain::error::{Error, Result};
use sr_domain::stream::{BoxStream, StreamingEvent};
use sr_domain::trace::TraceEvent;

use crate::traits::{BlockingAnswer, ChatRequest, ConversationBackend};
use crate::util::{from_reqwest, resolve_api_key};

/// Response mode sent in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseMode {
    Streaming,
    Blocking,
}

impl ResponseMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Blocking => "blocking",
        }
    }
}

pub struct ChatMessagesClient {
    url: String,
    api_key: String,
    inputs: HashMap<String, Value>,
    /// Whole-request timeout; used for blocking calls.
    blocking: reqwest::Client,
    /// Connect timeout only; stream duration is bounded by the caller.
    streaming: reqwest::Client,
}

impl ChatMessagesClient {
    pub fn new(cfg: &BackendConfig) -> Result<Self> {
        let api_key = resolve_api_key(cfg)?;

        let blocking = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.timeout())
            .build()
            .map_err(from_reqwest)?;
        let streaming = reqwest::Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            url: format!("{}/chat-messages", cfg.base_url.trim_end_matches('/')),
            api_key,
            inputs: cfg.inputs.clone(),
            blocking,
            streaming,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn build_body(&self, req: &ChatRequest, mode: ResponseMode) -> Value {
        let mut body = serde_json::json!({
            "inputs": self.inputs,
            "query": req.query,
            "response_mode": mode.as_str(),
            "user": req.user,
        });
        if let Some(ref conversation_id) = req.conversation_id {
            if !conversation_id.is_empty() {
                body["conversation_id"] = Value::String(conversation_id.clone());
            }
        }
        body
    }

    async fn post(
        &self,
        client: &reqwest::Client,
        req: &ChatRequest,
        mode: ResponseMode,
    ) -> Result<reqwest::Response> {
        let body = self.build_body(req, mode);
        let started = Instant::now();

        tracing::debug!(
            url = %self.url,
            mode = mode.as_str(),
            user = %req.user,
            has_conversation = req.conversation_id.is_some(),
            "chat-messages request"
        );

        let resp = client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        TraceEvent::BackendRequest {
            backend: self.backend_id().to_owned(),
            streaming: mode == ResponseMode::Streaming,
            status: status.as_u16(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        if !status.is_success() {
            let message = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Backend {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp)
    }
}

#[async_trait::async_trait]
impl ConversationBackend for ChatMessagesClient {
    async fn stream_chat(
        &self,
        req: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<StreamingEvent>>> {
        let resp = self
            .post(&self.streaming, req, ResponseMode::Streaming)
            .await?;
        Ok(crate::sse::response_event_stream(resp))
    }

    async fn block_chat(&self, req: &ChatRequest) -> Result<BlockingAnswer> {
        let resp = self.post(&self.blocking, req, ResponseMode::Blocking).await?;
        let text = resp.text().await.map_err(from_reqwest)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn backend_id(&self) -> &str {
        "chat-messages"
    }
}
