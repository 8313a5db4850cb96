//! `streamrelay ask`: one streaming turn rendered to the terminal.
//!
//! Runs the same turn runner as the server, with the console standing in
//! for the chat surface.

use std::sync::Arc;

use anyhow::Context;

use sr_backend::{ChatMessagesClient, ConversationBackend};
use sr_domain::config::Config;
use sr_sessions::SessionStore;

use crate::bootstrap;
use crate::runtime::TurnJob;
use crate::surface::{CardSurface, ConsoleSurface, ReplyTarget};

pub async fn ask(
    config: Arc<Config>,
    message: String,
    user: String,
    conversation: Option<String>,
) -> anyhow::Result<()> {
    bootstrap::check_config(&config)?;

    let sessions = Arc::new(
        SessionStore::from_config(&config.sessions).context("initializing session store")?,
    );
    let backend: Arc<dyn ConversationBackend> = Arc::new(
        ChatMessagesClient::new(&config.backend).context("creating backend client")?,
    );
    let surface: Arc<dyn CardSurface> = Arc::new(ConsoleSurface::new());
    let runner = bootstrap::build_runner(&config, backend, sessions, surface)?;

    let mut job = TurnJob::new(user, message.trim(), ReplyTarget::default());
    job.conversation_id = conversation;
    anyhow::ensure!(!job.query.is_empty(), "message is empty");

    let outcome = runner.run(&job).await?;
    if let Some(conversation_id) = &outcome.conversation_id {
        eprintln!("conversation: {conversation_id}");
    }
    Ok(())
}
