//! Event delivery for one traversal run.

use std::path::PathBuf;
use std::sync::Arc;

use linkwalk_core::{
    EntryKind, EntryRecord, EventMask, Failure, WalkError, WalkEvent, WalkSummary,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::progress::ProgressTracker;

/// Pushes events into the run's bounded channel and keeps the tallies.
///
/// Every send races the stop signal: once a run is cancelled, blocked sends
/// are abandoned so in-flight expansions can drain. A closed channel cancels
/// the run.
#[derive(Debug)]
pub(crate) struct Emitter {
    tx: mpsc::Sender<WalkEvent>,
    mask: EventMask,
    cancel: CancellationToken,
    tracker: ProgressTracker,
}

impl Emitter {
    pub fn new(tx: mpsc::Sender<WalkEvent>, mask: EventMask, cancel: CancellationToken) -> Self {
        Self {
            tx,
            mask,
            cancel,
            tracker: ProgressTracker::new(),
        }
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Report the root directory.
    pub async fn root(&self, record: EntryRecord) {
        self.send(WalkEvent::Root(Arc::new(record))).await;
    }

    /// Report an accepted entry: `Path`, then its kind-specific event.
    ///
    /// Both events take adjacent slots in the channel, so no other event
    /// lands between them. With `as_link`, the entry is a reported hard-link
    /// duplicate and goes out as `Link` whatever its kind.
    pub async fn entry(&self, record: EntryRecord, as_link: bool) {
        self.tracker.record_entry(record.kind, as_link, record.size);

        let record = Arc::new(record);
        let event = match record.kind {
            _ if as_link => WalkEvent::Link(Arc::clone(&record)),
            EntryKind::File => WalkEvent::File(Arc::clone(&record)),
            EntryKind::Directory => WalkEvent::Directory(Arc::clone(&record)),
            EntryKind::Symlink => WalkEvent::Link(Arc::clone(&record)),
            EntryKind::Other => WalkEvent::Other(Arc::clone(&record)),
        };

        self.send_adjacent(vec![WalkEvent::Path(record), event]).await;
    }

    /// Count a suppressed hard-link duplicate.
    pub fn duplicate(&self) {
        self.tracker.record_duplicate();
    }

    /// Count a directory whose listing succeeded.
    pub fn expanded(&self) {
        self.tracker.record_expanded();
    }

    /// Report a directory with no children.
    pub async fn empty(&self, path: PathBuf) {
        self.send(WalkEvent::Empty(path)).await;
    }

    /// Report a failed probe or listing: `Error` when the cause warrants it, then `Fail`.
    pub async fn failure(&self, path: PathBuf, error: WalkError) {
        let failure = Failure::from_error(&path, &error);
        self.tracker.record_failure();

        let mut events = Vec::with_capacity(2);
        if failure.kind.reports_error() {
            self.tracker.record_error();
            events.push(WalkEvent::Error { path, error });
        }
        events.push(WalkEvent::Fail(failure));

        self.send_adjacent(events).await;
    }

    /// Report a rejected symlink cycle.
    pub async fn cycle(&self, path: PathBuf) {
        self.tracker.record_failure();
        self.send(WalkEvent::Fail(Failure::cycle(path))).await;
    }

    /// Send the terminal event. Not subject to the mask or the stop signal.
    pub async fn end(&self, summary: WalkSummary) {
        // The receiver may already be gone
        let _ = self.tx.send(WalkEvent::End(summary)).await;
    }

    /// Send one event. Returns `false` once the run is stopped or the receiver is gone.
    async fn send(&self, event: WalkEvent) -> bool {
        self.send_adjacent(vec![event]).await
    }

    /// Send events back to back, reserving a slot for each before the first goes out.
    ///
    /// Masked events are dropped first. Returns `false` once the run is
    /// stopped or the receiver is gone.
    async fn send_adjacent(&self, mut events: Vec<WalkEvent>) -> bool {
        events.retain(|event| self.mask.subscribes(event.kind()));
        if events.is_empty() {
            return !self.cancel.is_cancelled();
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            permits = self.tx.reserve_many(events.len()) => match permits {
                Ok(permits) => {
                    for (permit, event) in permits.zip(events) {
                        permit.send(event);
                    }
                    true
                }
                Err(_) => {
                    tracing::debug!("event receiver dropped, stopping walk");
                    self.cancel.cancel();
                    false
                }
            }
        }
    }
}
