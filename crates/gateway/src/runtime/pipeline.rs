//! Per-turn pipeline: a one-slot mailbox for answer snapshots plus a close
//! signal.
//!
//! The event reader offers the accumulated answer after every fragment.
//! Offers never wait: when the slot is still occupied the new snapshot is
//! dropped, which keeps card refreshes bounded by the drain loop's tick rate
//! no matter how fast fragments arrive.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Result of a non-blocking [`PipelineHandle::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    /// The slot was occupied; the older snapshot stays.
    Dropped,
    /// The pipeline is closed.
    Closed,
}

/// Receiving side of the mailbox, owned by the drain loop.
pub struct Mailbox {
    rx: mpsc::Receiver<String>,
}

impl Mailbox {
    /// Wait for the next snapshot.  `None` once the pipeline is closed and
    /// the slot is empty.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take the pending snapshot without waiting.
    pub fn try_take(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

pub struct PipelineHandle {
    // `None` after close.  The mutex orders offers against close so nothing
    // is ever sent on a torn-down pipeline.
    sender: Mutex<Option<mpsc::Sender<String>>>,
    closed: AtomicBool,
    signal: CancellationToken,
}

impl PipelineHandle {
    pub fn new() -> (Self, Mailbox) {
        let (tx, rx) = mpsc::channel(1);
        let handle = Self {
            sender: Mutex::new(Some(tx)),
            closed: AtomicBool::new(false),
            signal: CancellationToken::new(),
        };
        (handle, Mailbox { rx })
    }

    /// Offer a snapshot without waiting.
    pub fn offer(&self, snapshot: String) -> Offer {
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return Offer::Closed;
        };
        match tx.try_send(snapshot) {
            Ok(()) => Offer::Accepted,
            Err(mpsc::error::TrySendError::Full(_)) => Offer::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    /// Close the pipeline.  Safe to call any number of times from any task;
    /// only the first call tears down and returns `true`.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.signal.cancel();
        self.sender.lock().take();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Token that fires when the pipeline closes.
    pub fn close_signal(&self) -> CancellationToken {
        self.signal.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn second_offer_is_dropped_until_taken() {
        let (pipeline, mut mailbox) = PipelineHandle::new();
        assert_eq!(pipeline.offer("a".into()), Offer::Accepted);
        assert_eq!(pipeline.offer("ab".into()), Offer::Dropped);

        // The slot kept the older value.
        assert_eq!(mailbox.try_take().as_deref(), Some("a"));
        assert_eq!(pipeline.offer("abc".into()), Offer::Accepted);
        assert_eq!(mailbox.recv().await.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (pipeline, _mailbox) = PipelineHandle::new();
        assert!(!pipeline.is_closed());
        assert!(pipeline.close());
        assert!(!pipeline.close());
        assert!(!pipeline.close());
        assert!(pipeline.is_closed());
        assert!(pipeline.close_signal().is_cancelled());
    }

    #[tokio::test]
    async fn offer_after_close_is_rejected() {
        let (pipeline, mut mailbox) = PipelineHandle::new();
        pipeline.close();
        assert_eq!(pipeline.offer("late".into()), Offer::Closed);
        assert_eq!(mailbox.recv().await, None);
    }

    #[tokio::test]
    async fn concurrent_close_has_exactly_one_winner() {
        let (pipeline, _mailbox) = PipelineHandle::new();
        let pipeline = Arc::new(pipeline);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let p = pipeline.clone();
                tokio::spawn(async move { p.close() })
            })
            .collect();

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(pipeline.is_closed());
    }
}
