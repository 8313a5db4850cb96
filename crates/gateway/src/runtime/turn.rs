//! One streaming turn, start to finish.
//!
//! Opens the backend stream, sends a card, feeds events through the
//! [`TurnReader`] while the drain loop refreshes the card, then writes the
//! complete answer to the card and logs the question.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use sr_backend::{ChatRequest, ConversationBackend};
use sr_domain::config::PipelineConfig;
use sr_domain::error::{Error, Result};
use sr_domain::stream::{BoxStream, StreamingEvent};
use sr_domain::trace::TraceEvent;
use sr_sessions::SessionStore;

use super::drain::{DrainReport, UpdateDrain};
use super::pipeline::PipelineHandle;
use super::queue::{TurnHandler, TurnJob};
use super::reader::{Step, TurnReader};
use crate::services::{AuditRecord, AuditSink};
use crate::surface::{push_update, CardContent, CardSurface};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Settings + outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub tick_interval: Duration,
    /// Deadline for the whole turn: stream open, card send and reading.
    /// `None` lets a turn run as long as the backend keeps streaming.
    pub turn_timeout: Option<Duration>,
    /// Card text shown when a turn fails after its card was sent.
    pub error_text: String,
}

impl TurnSettings {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            tick_interval: cfg.tick_interval(),
            turn_timeout: cfg.turn_timeout(),
            error_text: cfg.error_text.clone(),
        }
    }
}

/// How a successful turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The backend sent `message_end`.
    MessageEnd,
    /// The stream ended without a terminal event.
    StreamExhausted,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub card_id: String,
    pub answer: String,
    /// The user's conversation after the turn.
    pub conversation_id: Option<String>,
    pub completion: Completion,
    /// Intermediate card updates started by the drain loop.
    pub updates_dispatched: usize,
    pub duration: Duration,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Runner
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct TurnRunner {
    backend: Arc<dyn ConversationBackend>,
    sessions: Arc<SessionStore>,
    surface: Arc<dyn CardSurface>,
    audit: Option<Arc<dyn AuditSink>>,
    settings: TurnSettings,
}

impl TurnRunner {
    pub fn new(
        backend: Arc<dyn ConversationBackend>,
        sessions: Arc<SessionStore>,
        surface: Arc<dyn CardSurface>,
        audit: Option<Arc<dyn AuditSink>>,
        settings: TurnSettings,
    ) -> Self {
        Self {
            backend,
            sessions,
            surface,
            audit,
            settings,
        }
    }

    pub async fn run(&self, job: &TurnJob) -> Result<TurnOutcome> {
        let started = Instant::now();

        let conversation_id = match job.conversation_id.clone().filter(|c| !c.is_empty()) {
            Some(c) => Some(c),
            None => self.sessions.get(&job.user_id),
        };
        let req = ChatRequest::new(job.user_id.clone(), job.query.clone())
            .with_conversation(conversation_id.clone());

        let deadline = self
            .settings
            .turn_timeout
            .map(|limit| (tokio::time::Instant::now() + limit, limit));

        // ── 1. Open the stream (no card yet) ──────────────────────────
        let mut events = match within(deadline, self.backend.stream_chat(&req)).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(user_id = %job.user_id, error = %e, "backend stream failed to open");
                let outcome = match e {
                    Error::Timeout(_) => "timeout",
                    _ => "backend_unavailable",
                };
                finished(job, outcome, 0, 0, started);
                return Err(e);
            }
        };

        // ── 2. Card + drain loop ──────────────────────────────────────
        let card_id = uuid::Uuid::new_v4().to_string();
        let (pipeline, mailbox) = PipelineHandle::new();
        let pipeline = Arc::new(pipeline);
        let tracker = TaskTracker::new();
        let drain = UpdateDrain {
            card_id: card_id.clone(),
            period: self.settings.tick_interval,
            surface: self.surface.clone(),
            tracker: tracker.clone(),
        }
        .spawn(mailbox, pipeline.close_signal());

        TraceEvent::TurnStarted {
            user_id: job.user_id.clone(),
            card_id: card_id.clone(),
            has_conversation: conversation_id.is_some(),
        }
        .emit();

        if let Err(e) = within(deadline, self.surface.send_card(&card_id, &job.reply)).await {
            tracing::error!(card_id = %card_id, error = %e, "sending card failed");
            wind_down(&pipeline, drain, &tracker).await;
            finished(job, "card_failed", 0, 0, started);
            return Err(e);
        }

        // ── 3. Read events ────────────────────────────────────────────
        let mut reader = TurnReader::new(job.user_id.clone(), pipeline.clone(), self.sessions.clone());
        let result = within(deadline, read_events(&mut reader, &mut events)).await;
        drop(events);

        // ── 4. Stop refreshes before the last write ───────────────────
        let report = wind_down(&pipeline, drain, &tracker).await;

        match result {
            Ok(completion) => {
                let answer = reader.into_answer();
                push_update(
                    self.surface.as_ref(),
                    &card_id,
                    &CardContent::final_answer(answer.clone()),
                )
                .await;

                let conversation_id = self.sessions.get(&job.user_id);
                if let Some(audit) = &self.audit {
                    record_audit(audit.as_ref(), job, &answer, conversation_id.as_deref()).await;
                }

                finished(job, "completed", answer.chars().count(), report.dispatched, started);
                Ok(TurnOutcome {
                    card_id,
                    answer,
                    conversation_id,
                    completion,
                    updates_dispatched: report.dispatched,
                    duration: started.elapsed(),
                })
            }
            Err(e) => {
                let outcome = match &e {
                    Error::BackendEvent(_) => "backend_error",
                    Error::Timeout(_) => "timeout",
                    _ => "stream_error",
                };
                if matches!(e, Error::BackendEvent(_) | Error::Timeout(_)) {
                    push_update(
                        self.surface.as_ref(),
                        &card_id,
                        &CardContent::failed(self.settings.error_text.clone()),
                    )
                    .await;
                }
                tracing::warn!(user_id = %job.user_id, card_id = %card_id, error = %e, "turn failed");
                finished(
                    job,
                    outcome,
                    reader.answer().as_str().chars().count(),
                    report.dispatched,
                    started,
                );
                Err(e)
            }
        }
    }
}

#[async_trait::async_trait]
impl TurnHandler for TurnRunner {
    async fn handle(&self, job: TurnJob) {
        match self.run(&job).await {
            Ok(outcome) => tracing::info!(
                user_id = %job.user_id,
                card_id = %outcome.card_id,
                answer_chars = outcome.answer.chars().count(),
                updates = outcome.updates_dispatched,
                duration_ms = outcome.duration.as_millis() as u64,
                "turn completed"
            ),
            Err(e) => tracing::warn!(user_id = %job.user_id, error = %e, "turn aborted"),
        }
    }
}

// ── helpers ──────────────────────────────────────────────────────────

/// Run `fut` until the turn deadline, if there is one.
async fn within<T>(
    deadline: Option<(tokio::time::Instant, Duration)>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    let Some((at, limit)) = deadline else {
        return fut.await;
    };
    tokio::time::timeout_at(at, fut)
        .await
        .unwrap_or_else(|_| Err(Error::Timeout(format!("turn exceeded {}s", limit.as_secs()))))
}

async fn read_events(
    reader: &mut TurnReader,
    events: &mut BoxStream<'static, Result<StreamingEvent>>,
) -> Result<Completion> {
    while let Some(item) = events.next().await {
        let event = item?;
        if let Step::Completed { .. } = reader.handle(&event)? {
            return Ok(Completion::MessageEnd);
        }
    }
    Ok(Completion::StreamExhausted)
}

/// Close the pipeline, wait for the drain loop and for every update it
/// started.  Nothing it dispatched can land after this returns.
async fn wind_down(
    pipeline: &PipelineHandle,
    drain: JoinHandle<DrainReport>,
    tracker: &TaskTracker,
) -> DrainReport {
    pipeline.close();
    let report = drain.await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "drain loop task failed");
        DrainReport::default()
    });
    tracker.close();
    tracker.wait().await;
    report
}

async fn record_audit(
    audit: &dyn AuditSink,
    job: &TurnJob,
    answer: &str,
    conversation_id: Option<&str>,
) {
    let record = AuditRecord {
        name: job.user_name.clone(),
        query: job.query.clone(),
        reply: answer.to_owned(),
        user_id: job.user_id.clone(),
        session_id: conversation_id.unwrap_or_default().to_owned(),
        chat_type: job.reply.chat_type.code(),
    };
    let result = audit.record(&record).await;
    if let Err(ref e) = result {
        tracing::warn!(user_id = %job.user_id, error = %e, "question log write failed");
    }
    TraceEvent::AuditRecorded {
        user_id: job.user_id.clone(),
        ok: result.is_ok(),
    }
    .emit();
}

fn finished(job: &TurnJob, outcome: &str, answer_chars: usize, updates: usize, started: Instant) {
    TraceEvent::TurnFinished {
        user_id: job.user_id.clone(),
        outcome: outcome.to_owned(),
        answer_chars,
        updates_dispatched: updates,
        duration_ms: started.elapsed().as_millis() as u64,
    }
    .emit();
}
