//! User → backend conversation store.
//!
//! A mapping is refreshed every time a turn completes and is visible only
//! while `now < expires_at`.  Reading an expired mapping evicts it; there is
//! no background sweeper.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use sr_domain::config::{SessionStoreKind, SessionsConfig};
use sr_domain::error::Result;
use sr_domain::trace::TraceEvent;

use crate::backend::{MemoryBackend, SessionBackend};
use crate::file::FileBackend;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub conversation_id: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Expired at exactly `expires_at`, not only after it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SessionStore {
    backend: Box<dyn SessionBackend>,
    ttl: Duration,
    // Serializes the read-check-evict sequence against concurrent upserts.
    op_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(backend: Box<dyn SessionBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            ttl,
            op_lock: Mutex::new(()),
        }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Box::new(MemoryBackend::new()), ttl)
    }

    pub fn from_config(config: &SessionsConfig) -> Result<Self> {
        let backend: Box<dyn SessionBackend> = match config.store {
            SessionStoreKind::Memory => Box::new(MemoryBackend::new()),
            SessionStoreKind::File => Box::new(FileBackend::open(&config.state_path)?),
        };
        tracing::info!(
            backend = backend.name(),
            ttl_minutes = config.ttl_minutes,
            "session store ready"
        );
        Ok(Self::new(backend, config.ttl()))
    }

    /// Point `user_id` at `conversation_id` for another full TTL window.
    pub fn upsert(&self, user_id: &str, conversation_id: &str) {
        self.upsert_at(user_id, conversation_id, Utc::now());
    }

    pub fn upsert_at(&self, user_id: &str, conversation_id: &str, now: DateTime<Utc>) {
        let record = SessionRecord {
            conversation_id: conversation_id.to_owned(),
            expires_at: now + self.ttl,
        };

        let _guard = self.op_lock.lock();
        if let Err(e) = self.backend.put(user_id, record) {
            tracing::warn!(user_id, error = %e, "session upsert failed");
            return;
        }

        TraceEvent::SessionUpserted {
            user_id: user_id.to_owned(),
            conversation_id: conversation_id.to_owned(),
        }
        .emit();
    }

    /// Current conversation for `user_id`, if one exists and has not expired.
    pub fn get(&self, user_id: &str) -> Option<String> {
        self.get_at(user_id, Utc::now())
    }

    pub fn get_at(&self, user_id: &str, now: DateTime<Utc>) -> Option<String> {
        let _guard = self.op_lock.lock();

        let record = match self.backend.fetch(user_id) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "session lookup failed");
                None
            }
        };

        let found = match record {
            Some(record) if record.is_expired(now) => {
                if let Err(e) = self.backend.remove(user_id) {
                    tracing::warn!(user_id, error = %e, "session eviction failed");
                }
                TraceEvent::SessionExpired {
                    user_id: user_id.to_owned(),
                }
                .emit();
                None
            }
            other => other.map(|r| r.conversation_id),
        };

        TraceEvent::SessionResolved {
            user_id: user_id.to_owned(),
            found: found.is_some(),
        }
        .emit();

        found
    }

    /// Stored mappings, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sr_domain::error::Error;

    fn store() -> SessionStore {
        SessionStore::in_memory(Duration::minutes(30))
    }

    #[test]
    fn missing_user_is_not_found() {
        assert_eq!(store().get("nobody"), None);
    }

    #[test]
    fn upsert_then_get_returns_conversation() {
        let s = store();
        s.upsert("u1", "c1");
        assert_eq!(s.get("u1").as_deref(), Some("c1"));
    }

    #[test]
    fn upsert_overwrites_and_refreshes_expiry() {
        let s = store();
        let t0 = Utc::now();
        s.upsert_at("u1", "c1", t0);
        s.upsert_at("u1", "c2", t0 + Duration::minutes(20));

        // Still live 40 minutes after the first write because the second one
        // restarted the window.
        assert_eq!(
            s.get_at("u1", t0 + Duration::minutes(40)).as_deref(),
            Some("c2")
        );
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let s = store();
        let t0 = Utc::now();
        s.upsert_at("u1", "c1", t0);

        let just_before = t0 + Duration::minutes(30) - Duration::milliseconds(1);
        assert_eq!(s.get_at("u1", just_before).as_deref(), Some("c1"));

        let at_expiry = t0 + Duration::minutes(30);
        assert_eq!(s.get_at("u1", at_expiry), None);
    }

    #[test]
    fn expired_read_evicts() {
        let s = store();
        let t0 = Utc::now();
        s.upsert_at("u1", "c1", t0);
        s.upsert_at("u2", "c2", t0);
        assert_eq!(s.len(), 2);

        assert_eq!(s.get_at("u1", t0 + Duration::hours(1)), None);
        assert_eq!(s.len(), 1);

        // A later read at an earlier clock cannot resurrect it.
        assert_eq!(s.get_at("u1", t0), None);
    }

    #[test]
    fn concurrent_access_is_consistent() {
        let s = Arc::new(store());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let s = s.clone();
                std::thread::spawn(move || {
                    let user = format!("u{i}");
                    for n in 0..200 {
                        s.upsert(&user, &format!("c{n}"));
                        assert!(s.get(&user).is_some());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(s.len(), 8);
        assert_eq!(s.get("u3").as_deref(), Some("c199"));
    }

    struct BrokenBackend;

    impl SessionBackend for BrokenBackend {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn put(&self, _: &str, _: SessionRecord) -> Result<()> {
            Err(Error::Store("unavailable".into()))
        }
        fn fetch(&self, _: &str) -> Result<Option<SessionRecord>> {
            Err(Error::Store("unavailable".into()))
        }
        fn remove(&self, _: &str) -> Result<()> {
            Err(Error::Store("unavailable".into()))
        }
        fn len(&self) -> usize {
            0
        }
    }

    #[test]
    fn backend_failures_read_as_not_found() {
        let s = SessionStore::new(Box::new(BrokenBackend), Duration::minutes(30));
        s.upsert("u1", "c1");
        assert_eq!(s.get("u1"), None);
    }

    #[test]
    fn from_config_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SessionsConfig {
            ttl_minutes: 30,
            store: SessionStoreKind::File,
            state_path: dir.path().to_path_buf(),
        };
        {
            let s = SessionStore::from_config(&cfg).unwrap();
            assert_eq!(s.backend_name(), "file");
            s.upsert("u1", "c1");
        }
        let s = SessionStore::from_config(&cfg).unwrap();
        assert_eq!(s.get("u1").as_deref(), Some("c1"));
    }
}
