//! Bounded turn queue with a single worker.
//!
//! Inbound handlers submit jobs; one worker task takes them in FIFO order
//! and runs each turn to completion before taking the next.  A full queue
//! makes `submit` wait rather than drop the job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use sr_domain::error::{Error, Result};
use sr_domain::trace::TraceEvent;

use crate::surface::ReplyTarget;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn job
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One accepted inbound message waiting to be answered.
#[derive(Debug, Clone)]
pub struct TurnJob {
    pub user_id: String,
    /// Display name, used for the question log.
    pub user_name: String,
    /// Conversation to continue.  Left `None` at submit time and resolved
    /// from the session store when the job is processed.
    pub conversation_id: Option<String>,
    pub query: String,
    pub reply: ReplyTarget,
    /// Level returned by the permission check, `0` when checks are off.
    pub permission: i64,
    pub received_at: DateTime<Utc>,
}

impl TurnJob {
    pub fn new(user_id: impl Into<String>, query: impl Into<String>, reply: ReplyTarget) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: String::new(),
            conversation_id: None,
            query: query.into(),
            reply,
            permission: 0,
            received_at: Utc::now(),
        }
    }
}

/// Processes one job.  Errors are handled inside; the worker only sequences.
#[async_trait::async_trait]
pub trait TurnHandler: Send + Sync {
    async fn handle(&self, job: TurnJob);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Queue + worker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone)]
pub struct TurnQueue {
    tx: mpsc::Sender<TurnJob>,
}

/// Handle to the worker task.
pub struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl TurnQueue {
    /// Create the queue and spawn its worker.
    pub fn start(capacity: usize, handler: Arc<dyn TurnHandler>) -> (Self, Worker) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(worker_loop(rx, handler, cancel.clone()));
        tracing::info!(capacity = capacity.max(1), "turn worker started");
        (Self { tx }, Worker { cancel, handle })
    }

    /// Enqueue a job, waiting while the queue is full.
    pub async fn submit(&self, job: TurnJob) -> Result<()> {
        let user_id = job.user_id.clone();
        self.tx
            .send(job)
            .await
            .map_err(|_| Error::Other("turn queue is shut down".into()))?;

        TraceEvent::TurnQueued {
            user_id,
            depth: self.depth(),
        }
        .emit();
        Ok(())
    }

    /// Jobs waiting, not counting the one being processed.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl Worker {
    /// Stop after the in-flight turn finishes and wait for the task.
    /// Jobs still queued are dropped.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "turn worker ended abnormally");
        }
    }
}

async fn worker_loop(
    mut rx: mpsc::Receiver<TurnJob>,
    handler: Arc<dyn TurnHandler>,
    cancel: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        if job.query.trim().is_empty() {
            tracing::debug!(user_id = %job.user_id, "skipping job with empty query");
            continue;
        }

        handler.handle(job).await;
    }

    tracing::info!("turn worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;

    /// Records job order and tracks overlapping execution.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        active: Mutex<usize>,
        max_active: Mutex<usize>,
    }

    #[async_trait::async_trait]
    impl TurnHandler for Recorder {
        async fn handle(&self, job: TurnJob) {
            {
                let mut active = self.active.lock();
                *active += 1;
                let mut max = self.max_active.lock();
                *max = (*max).max(*active);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.seen.lock().push(job.query);
            *self.active.lock() -= 1;
        }
    }

    fn job(query: &str) -> TurnJob {
        TurnJob::new("u1", query, ReplyTarget::default())
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_run_one_at_a_time_in_order() {
        let recorder = Arc::new(Recorder::default());
        let (queue, worker) = TurnQueue::start(8, recorder.clone());

        for q in ["a", "b", "c", "d"] {
            queue.submit(job(q)).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(*recorder.seen.lock(), vec!["a", "b", "c", "d"]);
        assert_eq!(*recorder.max_active.lock(), 1);
        worker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn empty_queries_are_skipped() {
        let recorder = Arc::new(Recorder::default());
        let (queue, worker) = TurnQueue::start(8, recorder.clone());

        queue.submit(job("  ")).await.unwrap();
        queue.submit(job("real")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(*recorder.seen.lock(), vec!["real"]);
        worker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_blocks_submit() {
        let recorder = Arc::new(Recorder::default());
        let (queue, worker) = TurnQueue::start(1, recorder.clone());

        // First job is taken by the worker, second fills the slot.
        queue.submit(job("1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        queue.submit(job("2")).await.unwrap();
        assert_eq!(queue.depth(), 1);

        let blocked = tokio::time::timeout(Duration::from_millis(1), queue.submit(job("3"))).await;
        assert!(blocked.is_err(), "submit should wait while the queue is full");

        // Once the worker drains, the same submit goes through.
        queue.submit(job("3")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*recorder.seen.lock(), vec!["1", "2", "3"]);
        worker.shutdown().await;
    }

    #[tokio::test]
    async fn submit_after_shutdown_fails() {
        let recorder = Arc::new(Recorder::default());
        let (queue, worker) = TurnQueue::start(4, recorder);
        worker.shutdown().await;
        assert!(queue.submit(job("late")).await.is_err());
        assert_eq!(queue.capacity(), 4);
    }
}
