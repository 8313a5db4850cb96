//! Storage seam behind [`SessionStore`](crate::SessionStore).

use std::collections::HashMap;

use parking_lot::Mutex;

use sr_domain::error::Result;

use crate::store::SessionRecord;

/// Raw key/value storage for session records.
///
/// Implementations only store and retrieve; expiry is decided by the store.
pub trait SessionBackend: Send + Sync {
    /// Short name used in logs and health output.
    fn name(&self) -> &'static str;

    fn put(&self, user_id: &str, record: SessionRecord) -> Result<()>;

    fn fetch(&self, user_id: &str) -> Result<Option<SessionRecord>>;

    fn remove(&self, user_id: &str) -> Result<()>;

    /// Number of stored records, expired ones included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-process backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-local map.  Contents are lost on restart.
#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn put(&self, user_id: &str, record: SessionRecord) -> Result<()> {
        self.records.lock().insert(user_id.to_owned(), record);
        Ok(())
    }

    fn fetch(&self, user_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.records.lock().get(user_id).cloned())
    }

    fn remove(&self, user_id: &str) -> Result<()> {
        self.records.lock().remove(user_id);
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.lock().len()
    }
}
