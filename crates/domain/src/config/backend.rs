use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversational backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for the `/chat-messages` backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// API base, e.g. `https://api.dify.ai/v1`.  `/chat-messages` is appended.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Plaintext API key.  Prefer `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    /// Whole-request timeout for blocking calls.  Streaming calls only use
    /// the connect timeout; their duration is bounded by
    /// `pipeline.turn_timeout_secs`.
    #[serde(default = "d_120")]
    pub timeout_secs: u64,
    #[serde(default = "d_10")]
    pub connect_timeout_secs: u64,
    /// Static `inputs` object sent with every request.
    #[serde(default)]
    pub inputs: HashMap<String, serde_json::Value>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            api_key: None,
            api_key_env: d_api_key_env(),
            timeout_secs: 120,
            connect_timeout_secs: 10,
            inputs: HashMap::new(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn d_base_url() -> String {
    "http://localhost/v1".into()
}
fn d_api_key_env() -> String {
    "SR_BACKEND_API_KEY".into()
}
fn d_120() -> u64 {
    120
}
fn d_10() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_parse_from_toml_table() {
        let cfg: BackendConfig = toml::from_str(
            r#"
            base_url = "https://api.dify.ai/v1"
            [inputs]
            department = "ops"
            level = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.base_url, "https://api.dify.ai/v1");
        assert_eq!(cfg.inputs["department"], serde_json::json!("ops"));
        assert_eq!(cfg.inputs["level"], serde_json::json!(3));
        assert_eq!(cfg.api_key_env, "SR_BACKEND_API_KEY");
    }
}
