//! Clients for the optional user-management service: the permission
//! lookup run before a message is queued and the question log written after
//! each completed turn.

pub mod audit;
pub mod permission;

pub use audit::{AuditClient, AuditRecord, AuditSink};
pub use permission::{PermissionCheck, PermissionClient};
