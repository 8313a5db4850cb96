//! Card surface backed by the chat platform bridge.
//!
//! The bridge is a thin HTTP service in front of the chat platform's robot
//! API.  Cards are created with `POST /cards`, refreshed with
//! `PUT /cards/{id}` and plain replies go through `POST /replies`.

use reqwest::Client;
use serde_json::json;

use sr_domain::config::FrontendConfig;
use sr_domain::error::{Error, Result};

use super::{render_card, CardContent, CardStage, CardSurface, ChatType, ReplyTarget};
use crate::util::{expect_success, from_reqwest};

const CARD_TEMPLATE: &str = "StandardCard";

pub struct HttpBridgeSurface {
    http: Client,
    base_url: String,
    robot_code: Option<String>,
    card_title: String,
}

impl HttpBridgeSurface {
    pub fn new(cfg: &FrontendConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(cfg.update_timeout())
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            http,
            base_url: cfg.bridge_url.trim_end_matches('/').to_owned(),
            robot_code: cfg.robot_code.clone(),
            card_title: cfg.card_title.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn card_body(&self, card_id: &str, reply: &ReplyTarget) -> serde_json::Value {
        let card_data = render_card(Some(&self.card_title), "").to_string();
        let mut body = json!({
            "card_id": card_id,
            "card_template_id": CARD_TEMPLATE,
            "card_data": card_data,
            "robot_code": self.robot_code,
            "chat_type": reply.chat_type,
        });
        match reply.chat_type {
            ChatType::Group => {
                body["open_conversation_id"] = json!(reply.open_conversation_id);
            }
            ChatType::Direct => {
                body["single_chat_receiver"] = json!({ "userId": reply.staff_id });
            }
        }
        body
    }

    pub(crate) fn update_body(&self, content: &CardContent) -> serde_json::Value {
        let title = match content.stage {
            CardStage::Streaming => Some(self.card_title.as_str()),
            CardStage::Final | CardStage::Failed => None,
        };
        json!({ "card_data": render_card(title, &content.text).to_string() })
    }

    async fn reply(&self, reply: &ReplyTarget, message: serde_json::Value) -> Result<()> {
        let webhook = reply
            .session_webhook
            .as_deref()
            .ok_or_else(|| Error::Surface("reply target has no session webhook".into()))?;

        let resp = self
            .http
            .post(self.url("/replies"))
            .json(&json!({ "session_webhook": webhook, "message": message }))
            .send()
            .await
            .map_err(from_reqwest)?;
        expect_success(resp, Error::Surface).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CardSurface for HttpBridgeSurface {
    async fn send_card(&self, card_id: &str, reply: &ReplyTarget) -> Result<()> {
        let resp = self
            .http
            .post(self.url("/cards"))
            .json(&self.card_body(card_id, reply))
            .send()
            .await
            .map_err(from_reqwest)?;
        expect_success(resp, Error::Surface).await?;
        tracing::debug!(card_id, chat_type = ?reply.chat_type, "card sent");
        Ok(())
    }

    async fn update_card(&self, card_id: &str, content: &CardContent) -> Result<()> {
        let resp = self
            .http
            .put(self.url(&format!("/cards/{card_id}")))
            .json(&self.update_body(content))
            .send()
            .await
            .map_err(from_reqwest)?;
        expect_success(resp, Error::Surface).await?;
        Ok(())
    }

    async fn reply_text(&self, reply: &ReplyTarget, text: &str) -> Result<()> {
        self.reply(reply, json!({ "msgtype": "text", "text": { "content": text } }))
            .await
    }

    async fn reply_markdown(&self, reply: &ReplyTarget, title: &str, text: &str) -> Result<()> {
        self.reply(
            reply,
            json!({ "msgtype": "markdown", "markdown": { "title": title, "text": text } }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> HttpBridgeSurface {
        let cfg = FrontendConfig {
            bridge_url: "http://bridge.local/".into(),
            robot_code: Some("robot-1".into()),
            ..FrontendConfig::default()
        };
        HttpBridgeSurface::new(&cfg).unwrap()
    }

    #[test]
    fn group_card_targets_conversation() {
        let reply = ReplyTarget {
            chat_type: ChatType::Group,
            open_conversation_id: Some("cid-1".into()),
            ..ReplyTarget::default()
        };
        let body = surface().card_body("card-1", &reply);
        assert_eq!(body["card_id"], "card-1");
        assert_eq!(body["card_template_id"], "StandardCard");
        assert_eq!(body["robot_code"], "robot-1");
        assert_eq!(body["open_conversation_id"], "cid-1");
        assert!(body.get("single_chat_receiver").is_none());
    }

    #[test]
    fn direct_card_targets_staff_id() {
        let reply = ReplyTarget {
            staff_id: Some("staff-9".into()),
            ..ReplyTarget::default()
        };
        let body = surface().card_body("card-2", &reply);
        assert_eq!(body["single_chat_receiver"]["userId"], "staff-9");
    }

    #[test]
    fn final_update_drops_title() {
        let s = surface();
        let streaming = s.update_body(&CardContent::streaming("par"));
        let finished = s.update_body(&CardContent::final_answer("partial answer"));

        let streaming: serde_json::Value =
            serde_json::from_str(streaming["card_data"].as_str().unwrap()).unwrap();
        let finished: serde_json::Value =
            serde_json::from_str(finished["card_data"].as_str().unwrap()).unwrap();

        assert!(streaming.get("header").is_some());
        assert!(finished.get("header").is_none());
        assert_eq!(finished["contents"][0]["text"], "partial answer");
    }

    #[test]
    fn url_joins_without_double_slash() {
        assert_eq!(surface().url("/cards"), "http://bridge.local/cards");
    }
}
