//! Per-event state machine for one streaming turn.

use std::sync::Arc;

use sr_domain::error::{Error, Result};
use sr_domain::stream::{EventKind, StreamingEvent};
use sr_sessions::SessionStore;

use super::pipeline::PipelineHandle;

/// Append-only answer buffer.
#[derive(Debug, Default, Clone)]
pub struct AnswerAccumulator {
    text: String,
}

impl AnswerAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// What the caller should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// `message_end` arrived; the session is updated and the pipeline closed.
    Completed { conversation_id: String },
}

pub struct TurnReader {
    user_id: String,
    pipeline: Arc<PipelineHandle>,
    sessions: Arc<SessionStore>,
    answer: AnswerAccumulator,
    events_seen: usize,
}

impl TurnReader {
    pub fn new(user_id: String, pipeline: Arc<PipelineHandle>, sessions: Arc<SessionStore>) -> Self {
        Self {
            user_id,
            pipeline,
            sessions,
            answer: AnswerAccumulator::new(),
            events_seen: 0,
        }
    }

    /// Apply one event.  An `error` event closes the pipeline and comes back
    /// as [`Error::BackendEvent`].
    pub fn handle(&mut self, event: &StreamingEvent) -> Result<Step> {
        self.events_seen += 1;

        match &event.event {
            EventKind::Message | EventKind::AgentMessage => {
                self.answer.append(&event.answer);
                self.pipeline.offer(self.answer.as_str().to_owned());
                Ok(Step::Continue)
            }
            EventKind::MessageEnd => {
                if event.conversation_id.is_empty() {
                    tracing::warn!(user_id = %self.user_id, "message_end without conversation id");
                } else {
                    self.sessions.upsert(&self.user_id, &event.conversation_id);
                }
                self.pipeline.close();
                Ok(Step::Completed {
                    conversation_id: event.conversation_id.clone(),
                })
            }
            EventKind::Error => {
                let text = event.error_text();
                tracing::warn!(user_id = %self.user_id, error = %text, "backend reported an error");
                self.pipeline.close();
                Err(Error::BackendEvent(text))
            }
            EventKind::MessageReplace => Ok(Step::Continue),
            EventKind::WorkflowStarted
            | EventKind::WorkflowFinished
            | EventKind::NodeStarted
            | EventKind::NodeFinished => {
                tracing::debug!(kind = %event.event, "workflow progress");
                Ok(Step::Continue)
            }
            EventKind::Other(kind) => {
                tracing::debug!(kind = %kind, "ignoring unknown event kind");
                Ok(Step::Continue)
            }
        }
    }

    pub fn answer(&self) -> &AnswerAccumulator {
        &self.answer
    }

    pub fn events_seen(&self) -> usize {
        self.events_seen
    }

    pub fn into_answer(self) -> String {
        self.answer.into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::runtime::pipeline::Mailbox;

    fn reader() -> (TurnReader, Arc<PipelineHandle>, Arc<SessionStore>, Mailbox) {
        let (pipeline, mailbox) = PipelineHandle::new();
        let pipeline = Arc::new(pipeline);
        let sessions = Arc::new(SessionStore::in_memory(Duration::minutes(30)));
        let reader = TurnReader::new("u1".into(), pipeline.clone(), sessions.clone());
        (reader, pipeline, sessions, mailbox)
    }

    #[test]
    fn fragments_concatenate_in_order() {
        let (mut r, _, _, _mb) = reader();
        for f in ["He", "llo", ", ", "world"] {
            assert_eq!(r.handle(&StreamingEvent::message(f)).unwrap(), Step::Continue);
        }
        let mut agent = StreamingEvent::message("!");
        agent.event = EventKind::AgentMessage;
        r.handle(&agent).unwrap();
        assert_eq!(r.answer().as_str(), "Hello, world!");
    }

    #[test]
    fn message_end_upserts_and_closes() {
        let (mut r, pipeline, sessions, _mb) = reader();
        r.handle(&StreamingEvent::message("Hi")).unwrap();
        let step = r.handle(&StreamingEvent::message_end("c1")).unwrap();
        assert_eq!(step, Step::Completed { conversation_id: "c1".into() });
        assert!(pipeline.is_closed());
        assert_eq!(sessions.get("u1").as_deref(), Some("c1"));
    }

    #[test]
    fn error_event_closes_without_upsert() {
        let (mut r, pipeline, sessions, _mb) = reader();
        r.handle(&StreamingEvent::message("par")).unwrap();
        let err = r.handle(&StreamingEvent::error("boom")).unwrap_err();
        assert!(matches!(err, Error::BackendEvent(ref m) if m == "boom"));
        assert!(pipeline.is_closed());
        assert_eq!(sessions.get("u1"), None);
    }

    #[test]
    fn other_kinds_are_noops() {
        let (mut r, pipeline, _, _mb) = reader();
        for kind in [
            EventKind::MessageReplace,
            EventKind::WorkflowStarted,
            EventKind::NodeStarted,
            EventKind::NodeFinished,
            EventKind::WorkflowFinished,
            EventKind::Other("tts_message".into()),
        ] {
            assert_eq!(r.handle(&StreamingEvent::new(kind)).unwrap(), Step::Continue);
        }
        assert!(r.answer().is_empty());
        assert!(!pipeline.is_closed());
        assert_eq!(r.events_seen(), 6);
    }

    #[tokio::test]
    async fn fragments_after_close_do_not_reach_mailbox() {
        let (mut r, pipeline, _, mut mailbox) = reader();
        pipeline.close();
        r.handle(&StreamingEvent::message("late")).unwrap();
        assert_eq!(r.answer().as_str(), "late");
        assert_eq!(mailbox.recv().await, None);
    }
}
