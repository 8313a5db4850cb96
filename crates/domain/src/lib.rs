//! Shared types for StreamRelay: the error type, the backend streaming event
//! model, structured trace events and the configuration tree.

pub mod config;
pub mod error;
pub mod stream;
pub mod trace;
