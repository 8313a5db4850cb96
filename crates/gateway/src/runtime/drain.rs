//! Throttled card refresh loop.
//!
//! Runs beside the event reader for the lifetime of one turn.  Snapshots
//! arriving through the mailbox overwrite each other; every tick pushes the
//! newest unsent snapshot to the card as a detached task, so at most one
//! update starts per tick and a slow update never delays the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::pipeline::Mailbox;
use crate::surface::{push_update, CardContent, CardSurface};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Updates started by the loop.  The final update is not included.
    pub dispatched: usize,
}

pub struct UpdateDrain {
    pub card_id: String,
    pub period: Duration,
    pub surface: Arc<dyn CardSurface>,
    /// Tracks dispatched updates so the turn can wait for them.
    pub tracker: TaskTracker,
}

impl UpdateDrain {
    pub fn spawn(self, mailbox: Mailbox, signal: CancellationToken) -> JoinHandle<DrainReport> {
        tokio::spawn(self.run(mailbox, signal))
    }

    /// Loop until `signal` fires or the mailbox closes.  Exits immediately
    /// on close: a snapshot still pending is discarded.
    pub async fn run(self, mut mailbox: Mailbox, signal: CancellationToken) -> DrainReport {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut pending: Option<String> = None;
        let mut report = DrainReport::default();

        loop {
            tokio::select! {
                biased;

                _ = signal.cancelled() => break,

                _ = ticker.tick() => {
                    if let Some(text) = pending.take() {
                        report.dispatched += 1;
                        self.dispatch(text);
                    }
                }

                snapshot = mailbox.recv() => match snapshot {
                    Some(text) => pending = Some(text),
                    None => break,
                },
            }
        }

        tracing::debug!(
            card_id = %self.card_id,
            dispatched = report.dispatched,
            "drain loop stopped"
        );
        report
    }

    fn dispatch(&self, text: String) {
        let surface = self.surface.clone();
        let card_id = self.card_id.clone();
        self.tracker.spawn(async move {
            push_update(surface.as_ref(), &card_id, &CardContent::streaming(text)).await;
        });
    }
}
