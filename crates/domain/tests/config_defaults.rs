use sr_domain::config::{Config, OutputMode, SessionStoreKind};
use std::time::Duration;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 3210
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 3210);
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config.server.cors.allowed_origins.contains(&"http://localhost:*".to_string()));
    assert!(config.server.cors.allowed_origins.contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn pipeline_defaults_match_relay_behaviour() {
    let config = Config::default();
    assert_eq!(config.pipeline.queue_capacity, 1000);
    assert_eq!(config.pipeline.tick_interval(), Duration::from_millis(200));
    assert_eq!(config.sessions.ttl_minutes, 30);
    assert_eq!(config.sessions.store, SessionStoreKind::Memory);
    assert_eq!(config.frontend.output_mode, OutputMode::Stream);
}

#[test]
fn full_file_parses() {
    let toml_str = r#"
[backend]
base_url = "https://api.example.com/v1"
api_key_env = "MY_KEY"

[backend.inputs]
tenant = "acme"

[sessions]
ttl_minutes = 5
store = "file"
state_path = "/var/lib/streamrelay"

[pipeline]
queue_capacity = 10
tick_interval_ms = 50
turn_timeout_secs = 0

[frontend]
output_mode = "text"
supported_types = ["text"]

[permission]
enabled = true
base_url = "http://perm.local"

[audit]
enabled = true
base_url = "http://audit.local"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.backend.api_key_env, "MY_KEY");
    assert_eq!(config.backend.inputs["tenant"], "acme");
    assert_eq!(config.sessions.store, SessionStoreKind::File);
    assert_eq!(config.pipeline.queue_capacity, 10);
    assert!(config.pipeline.turn_timeout().is_none());
    assert_eq!(config.frontend.output_mode, OutputMode::Text);
    assert!(!config.frontend.supports("audio"));
    assert_eq!(config.permission.default_level, 1001);

    let errors: Vec<_> = config
        .validate()
        .into_iter()
        .filter(|e| e.severity == sr_domain::config::ConfigSeverity::Error)
        .collect();
    assert!(errors.is_empty(), "{errors:?}");
}

#[test]
fn api_token_env_default() {
    let config = Config::default();
    assert_eq!(config.server.api_token_env, "SR_API_TOKEN");
}
