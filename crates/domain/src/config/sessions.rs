use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// User → backend conversation mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Lifetime of a mapping after its last completed turn.
    #[serde(default = "d_30")]
    pub ttl_minutes: u64,
    #[serde(default)]
    pub store: SessionStoreKind,
    /// Root directory for the `file` store.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 30,
            store: SessionStoreKind::Memory,
            state_path: d_state_path(),
        }
    }
}

/// Backing used by the session store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStoreKind {
    /// In-process map; lost on restart.
    #[default]
    Memory,
    /// JSON file under `state_path/sessions/`, written through on every change.
    File,
}

fn d_30() -> u64 {
    30
}
fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}

impl SessionsConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.ttl_minutes.min(i32::MAX as u64) as i64)
    }
}
