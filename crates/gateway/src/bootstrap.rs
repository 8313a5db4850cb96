//! AppState construction extracted from `main.rs`.
//!
//! `serve` boots the full runtime through [`build_app_state`]; `ask` reuses
//! [`build_runner`] with its own surface and no HTTP listener.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use sr_backend::{ChatMessagesClient, ConversationBackend};
use sr_domain::config::{Config, ConfigSeverity};
use sr_sessions::SessionStore;

use crate::runtime::{TurnQueue, TurnRunner, TurnSettings, Worker};
use crate::services::{AuditClient, AuditSink, PermissionCheck, PermissionClient};
use crate::state::AppState;
use crate::surface::{CardSurface, HttpBridgeSurface};

/// Log every validation issue and fail on errors.
pub fn check_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }
    Ok(())
}

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`] plus the turn worker, which the caller shuts down on exit.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<(AppState, Worker)> {
    check_config(&config)?;

    // ── Sessions ─────────────────────────────────────────────────────
    let sessions = Arc::new(
        SessionStore::from_config(&config.sessions).context("initializing session store")?,
    );
    tracing::info!(restored = sessions.len(), "sessions restored");

    // ── Conversation backend ─────────────────────────────────────────
    let backend: Arc<dyn ConversationBackend> = Arc::new(
        ChatMessagesClient::new(&config.backend).context("creating backend client")?,
    );
    tracing::info!(url = %config.backend.base_url, "backend client ready");

    // ── Chat surface ─────────────────────────────────────────────────
    let surface: Arc<dyn CardSurface> = Arc::new(
        HttpBridgeSurface::new(&config.frontend).context("creating chat surface")?,
    );
    tracing::info!(
        bridge = %config.frontend.bridge_url,
        output_mode = ?config.frontend.output_mode,
        "chat surface ready"
    );

    // ── User-management services ─────────────────────────────────────
    let permission: Option<Arc<dyn PermissionCheck>> = if config.permission.enabled {
        let client = PermissionClient::new(&config.permission).context("creating permission client")?;
        tracing::info!(url = %config.permission.base_url, "permission checks enabled");
        Some(Arc::new(client))
    } else {
        tracing::info!("permission checks disabled");
        None
    };

    // ── Turn runner + queue ──────────────────────────────────────────
    let runner = build_runner(&config, backend.clone(), sessions.clone(), surface.clone())?;
    let (queue, worker) = TurnQueue::start(config.pipeline.queue_capacity, Arc::new(runner));

    // ── API token (read once, hash for constant-time comparison) ─────
    let api_token_hash = {
        let env_var = &config.server.api_token_env;
        match std::env::var(env_var).ok().filter(|t| !t.is_empty()) {
            Some(t) => {
                tracing::info!(source = %format!("env:{env_var}"), "API bearer-token auth enabled");
                Some(Sha256::digest(t.as_bytes()).to_vec())
            }
            None => {
                tracing::warn!("API bearer-token auth DISABLED; set the {env_var} env var");
                None
            }
        }
    };

    let state = AppState {
        config,
        backend,
        surface,
        sessions,
        queue,
        permission,
        api_token_hash,
    };
    Ok((state, worker))
}

/// Wire a [`TurnRunner`] around the given backend, sessions and surface.
/// The question log is attached when enabled in config.
pub fn build_runner(
    config: &Config,
    backend: Arc<dyn ConversationBackend>,
    sessions: Arc<SessionStore>,
    surface: Arc<dyn CardSurface>,
) -> anyhow::Result<TurnRunner> {
    let audit: Option<Arc<dyn AuditSink>> = if config.audit.enabled {
        let client = AuditClient::new(&config.audit).context("creating question log client")?;
        tracing::info!(url = %config.audit.base_url, "question log enabled");
        Some(Arc::new(client))
    } else {
        None
    };

    let settings = TurnSettings::from_config(&config.pipeline);
    tracing::info!(
        tick_ms = settings.tick_interval.as_millis() as u64,
        timeout_secs = settings.turn_timeout.map(|t| t.as_secs()),
        "turn runner ready"
    );
    Ok(TurnRunner::new(backend, sessions, surface, audit, settings))
}
