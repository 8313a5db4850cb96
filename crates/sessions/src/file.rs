//! JSON-file session backend.
//!
//! Records live in `state_path/sessions/sessions.json`.  The whole map is
//! loaded at open and rewritten after every mutation, so mappings survive a
//! restart of the gateway.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use sr_domain::error::{Error, Result};

use crate::backend::SessionBackend;
use crate::store::SessionRecord;

pub struct FileBackend {
    path: PathBuf,
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl FileBackend {
    /// Load or create the file at `state_path/sessions/sessions.json`.
    pub fn open(state_path: &Path) -> Result<Self> {
        let dir = state_path.join("sessions");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;

        let path = dir.join("sessions.json");
        let records = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            match serde_json::from_str(&raw) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "unreadable session file, starting empty"
                    );
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        tracing::info!(
            sessions = records.len(),
            path = %path.display(),
            "session file loaded"
        );

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, records: &HashMap<String, SessionRecord>) -> Result<()> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| Error::Store(format!("serializing sessions: {e}")))?;
        std::fs::write(&self.path, json).map_err(Error::Io)
    }
}

impl SessionBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn put(&self, user_id: &str, record: SessionRecord) -> Result<()> {
        let mut records = self.records.write();
        records.insert(user_id.to_owned(), record);
        self.flush(&records)
    }

    fn fetch(&self, user_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.records.read().get(user_id).cloned())
    }

    fn remove(&self, user_id: &str) -> Result<()> {
        let mut records = self.records.write();
        if records.remove(user_id).is_some() {
            self.flush(&records)?;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(conversation_id: &str) -> SessionRecord {
        SessionRecord {
            conversation_id: conversation_id.into(),
            expires_at: Utc::now() + Duration::minutes(30),
        }
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = FileBackend::open(dir.path()).unwrap();
            backend.put("u1", record("c1")).unwrap();
            backend.put("u2", record("c2")).unwrap();
            backend.remove("u2").unwrap();
        }

        let reopened = FileBackend::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.fetch("u1").unwrap().unwrap().conversation_id, "c1");
        assert!(reopened.fetch("u2").unwrap().is_none());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sessions")).unwrap();
        std::fs::write(dir.path().join("sessions/sessions.json"), "{not json").unwrap();

        let backend = FileBackend::open(dir.path()).unwrap();
        assert!(backend.is_empty());
        backend.put("u1", record("c1")).unwrap();
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn file_lands_under_sessions_dir() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path()).unwrap();
        backend.put("u1", record("c1")).unwrap();
        assert!(backend.path().ends_with("sessions/sessions.json"));
        assert!(backend.path().exists());
    }
}
