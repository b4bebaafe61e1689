//! Caller-side handle of a running walk.

use std::pin::Pin;
use std::task::{Context, Poll};

use linkwalk_core::{WalkEvent, WalkSummary};
use tokio::sync::{mpsc, watch};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::progress::WalkProgress;

/// Live event stream of one traversal run.
///
/// Events arrive in discovery order within each directory. The stream ends
/// right after [`WalkEvent::End`]. Dropping the handle stops the run.
#[derive(Debug)]
pub struct WalkHandle {
    events: mpsc::Receiver<WalkEvent>,
    cancel: CancellationToken,
    progress: watch::Receiver<WalkProgress>,
}

impl WalkHandle {
    pub(crate) fn new(
        events: mpsc::Receiver<WalkEvent>,
        cancel: CancellationToken,
        progress: watch::Receiver<WalkProgress>,
    ) -> Self {
        Self {
            events,
            cancel,
            progress,
        }
    }

    /// Receive the next event, or `None` once `End` has been consumed.
    pub async fn recv(&mut self) -> Option<WalkEvent> {
        self.events.recv().await
    }

    /// Stop issuing new probes and listings.
    ///
    /// In-flight work drains, then `End` arrives with `stopped` set.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// A cloneable handle that can stop the run from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.cancel.clone())
    }

    /// Check if a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Subscribe to progress snapshots.
    pub fn progress(&self) -> watch::Receiver<WalkProgress> {
        self.progress.clone()
    }

    /// Drain the run, returning every event including `End`.
    pub async fn collect(mut self) -> Vec<WalkEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }

    /// Drain the run, discarding events, and return its summary.
    pub async fn finish(mut self) -> WalkSummary {
        let mut summary = WalkSummary::default();
        while let Some(event) = self.recv().await {
            if let WalkEvent::End(end) = event {
                summary = end;
            }
        }
        summary
    }
}

impl Stream for WalkHandle {
    type Item = WalkEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for WalkHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Stops a walk from outside its handle.
#[derive(Debug, Clone)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    /// Stop the walk.
    pub fn stop(&self) {
        self.0.cancel();
    }

    /// Check if a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.0.is_cancelled()
    }
}
