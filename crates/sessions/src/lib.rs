//! Session management for StreamRelay.
//!
//! Maps a chat user to the backend conversation they are currently in.
//! Mappings expire a fixed time after the last completed turn; expiry is
//! lazy and enforced on read.  Storage is pluggable through
//! [`SessionBackend`].

pub mod backend;
pub mod file;
pub mod store;

pub use backend::{MemoryBackend, SessionBackend};
pub use file::FileBackend;
pub use store::{SessionRecord, SessionStore};
