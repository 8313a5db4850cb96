use serde::{Deserialize, Serialize};
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chat front-end (card surface)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How answers are delivered back to the chat front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    #[serde(default)]
    pub output_mode: OutputMode,
    /// Base URL of the card bridge that talks to the chat platform.
    #[serde(default = "d_bridge_url")]
    pub bridge_url: String,
    /// Robot identifier forwarded with new cards.
    #[serde(default)]
    pub robot_code: Option<String>,
    /// Title shown on cards while an answer is still streaming.
    #[serde(default = "d_card_title")]
    pub card_title: String,
    /// Inbound message types that are relayed.
    #[serde(default = "d_supported_types")]
    pub supported_types: Vec<String>,
    /// Per-call timeout for card sends and updates.
    #[serde(default = "d_5000")]
    pub update_timeout_ms: u64,
    #[serde(default = "d_unsupported_text")]
    pub unsupported_text: String,
    #[serde(default = "d_no_permission_text")]
    pub no_permission_text: String,
    #[serde(default = "d_internal_error_text")]
    pub internal_error_text: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::Stream,
            bridge_url: d_bridge_url(),
            robot_code: None,
            card_title: d_card_title(),
            supported_types: d_supported_types(),
            update_timeout_ms: 5000,
            unsupported_text: d_unsupported_text(),
            no_permission_text: d_no_permission_text(),
            internal_error_text: d_internal_error_text(),
        }
    }
}

impl FrontendConfig {
    pub fn update_timeout(&self) -> Duration {
        Duration::from_millis(self.update_timeout_ms)
    }

    pub fn supports(&self, msgtype: &str) -> bool {
        self.supported_types.iter().any(|t| t == msgtype)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Send a card and refresh it while the answer streams in.
    #[default]
    Stream,
    /// Blocking call, answer replied as plain text.
    Text,
    /// Blocking call, answer replied as markdown.
    Markdown,
}

fn d_bridge_url() -> String {
    "http://127.0.0.1:8090".into()
}
fn d_card_title() -> String {
    "Streaming answer".into()
}
fn d_supported_types() -> Vec<String> {
    vec!["text".into(), "audio".into(), "picture".into()]
}
fn d_5000() -> u64 {
    5000
}
fn d_unsupported_text() -> String {
    "Unsupported message format.".into()
}
fn d_no_permission_text() -> String {
    "Sorry, you do not have basic permission. Please apply for access.".into()
}
fn d_internal_error_text() -> String {
    "Internal server error.".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_supports_text_audio_picture() {
        let cfg = FrontendConfig::default();
        assert!(cfg.supports("text"));
        assert!(cfg.supports("audio"));
        assert!(cfg.supports("picture"));
        assert!(!cfg.supports("file"));
    }

    #[test]
    fn output_mode_parses_snake_case() {
        let cfg: FrontendConfig = toml::from_str(r#"output_mode = "markdown""#).unwrap();
        assert_eq!(cfg.output_mode, OutputMode::Markdown);
    }
}
