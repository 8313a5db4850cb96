mod backend;
mod frontend;
mod observability;
mod pipeline;
mod server;
mod services;
mod sessions;

pub use backend::*;
pub use frontend::*;
pub use observability::*;
pub use pipeline::*;
pub use server::*;
pub use services::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    #[serde(default)]
    pub permission: PermissionConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        if !is_http_url(&self.backend.base_url) {
            errors.push(ConfigError::error(
                "backend.base_url",
                "base_url must start with http:// or https://",
            ));
        }
        if self.backend.api_key.is_some() {
            errors.push(ConfigError::warning(
                "backend.api_key",
                "plaintext API key in config; prefer backend.api_key_env",
            ));
        }

        if self.sessions.ttl_minutes == 0 {
            errors.push(ConfigError::error(
                "sessions.ttl_minutes",
                "ttl must be greater than 0",
            ));
        }

        if self.pipeline.queue_capacity == 0 {
            errors.push(ConfigError::error(
                "pipeline.queue_capacity",
                "queue capacity must be greater than 0",
            ));
        }
        if self.pipeline.tick_interval_ms == 0 {
            errors.push(ConfigError::error(
                "pipeline.tick_interval_ms",
                "tick interval must be greater than 0",
            ));
        }
        if self.pipeline.turn_timeout_secs == 0 {
            errors.push(ConfigError::warning(
                "pipeline.turn_timeout_secs",
                "no turn timeout: a stalled backend stream blocks the queue indefinitely",
            ));
        }

        if !is_http_url(&self.frontend.bridge_url) {
            errors.push(ConfigError::error(
                "frontend.bridge_url",
                "bridge_url must start with http:// or https://",
            ));
        }
        if self.frontend.supported_types.is_empty() {
            errors.push(ConfigError::warning(
                "frontend.supported_types",
                "no message types are relayed",
            ));
        }

        if self.permission.enabled && !is_http_url(&self.permission.base_url) {
            errors.push(ConfigError::error(
                "permission.base_url",
                "permission control is enabled but base_url is not an http(s) URL",
            ));
        }
        if self.audit.enabled && !is_http_url(&self.audit.base_url) {
            errors.push(ConfigError::error(
                "audit.base_url",
                "audit log is enabled but base_url is not an http(s) URL",
            ));
        }

        errors
    }
}
