//! Client side of the conversational backend: the [`ConversationBackend`]
//! seam, the `/chat-messages` HTTP client and line-framed stream decoding.

pub mod client;
pub mod sse;
pub mod traits;
pub(crate) mod util;

// Re-exports for convenience.
pub use client::ChatMessagesClient;
pub use sse::event_stream;
pub use traits::{BlockingAnswer, ChatRequest, ConversationBackend};
pub use util::resolve_api_key;
