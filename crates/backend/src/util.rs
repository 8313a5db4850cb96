//! Shared helpers for the backend client.

use sr_domain::config::BackendConfig;
use sr_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the backend API key.
///
/// Precedence:
/// 1. `api_key` field (plaintext, warns)
/// 2. the environment variable named by `api_key_env`
/// 3. Error
pub fn resolve_api_key(cfg: &BackendConfig) -> Result<String> {
    if let Some(ref key) = cfg.api_key {
        tracing::warn!(
            "backend API key loaded from plaintext config field 'api_key'; \
             prefer 'api_key_env' instead"
        );
        return Ok(key.clone());
    }

    match std::env::var(&cfg.api_key_env) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(Error::Auth(format!(
            "no backend API key: set 'api_key' or the '{}' environment variable",
            cfg.api_key_env
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_key_wins() {
        let cfg = BackendConfig {
            api_key: Some("app-123".into()),
            api_key_env: "SR_TEST_UNUSED_KEY_VAR".into(),
            ..BackendConfig::default()
        };
        assert_eq!(resolve_api_key(&cfg).unwrap(), "app-123");
    }

    #[test]
    fn env_key_is_read() {
        std::env::set_var("SR_TEST_BACKEND_KEY_PRESENT", "app-env");
        let cfg = BackendConfig {
            api_key_env: "SR_TEST_BACKEND_KEY_PRESENT".into(),
            ..BackendConfig::default()
        };
        assert_eq!(resolve_api_key(&cfg).unwrap(), "app-env");
    }

    #[test]
    fn missing_key_is_auth_error() {
        let cfg = BackendConfig {
            api_key_env: "SR_TEST_BACKEND_KEY_ABSENT".into(),
            ..BackendConfig::default()
        };
        assert!(matches!(resolve_api_key(&cfg), Err(Error::Auth(_))));
    }
}
