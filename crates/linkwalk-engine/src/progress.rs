//! Run state and progress reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use linkwalk_core::{EntryKind, WalkSummary};
use strum::Display;
use tokio::sync::watch;

/// Lifecycle of one traversal run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum WalkState {
    /// Not started yet.
    #[default]
    Idle,
    /// Probing the root path.
    Probing,
    /// Directories are waiting in the queue.
    Expanding,
    /// The queue is empty; listings are still in flight.
    Draining,
    /// `End` has been sent. Terminal.
    Ended,
}

/// Snapshot of a running walk.
#[derive(Debug, Clone, Default)]
pub struct WalkProgress {
    /// Current lifecycle state.
    pub state: WalkState,
    /// Directory expansions started.
    pub tasks_issued: u64,
    /// Directory expansions finished.
    pub tasks_completed: u64,
    /// Directories waiting to be expanded.
    pub tasks_queued: usize,
    /// Entries reported so far, of every kind.
    pub entries: u64,
    /// Failures reported so far.
    pub failures: u64,
    /// Time elapsed since the walk started.
    pub elapsed: Duration,
}

impl WalkProgress {
    /// Directory expansions currently running.
    pub fn in_flight(&self) -> u64 {
        self.tasks_issued - self.tasks_completed
    }

    /// Calculate the walk rate in entries per second.
    pub fn entries_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.entries as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Counters updated concurrently by every expansion of a run.
#[derive(Debug, Default)]
pub(crate) struct ProgressTracker {
    files: AtomicU64,
    directories: AtomicU64,
    links: AtomicU64,
    others: AtomicU64,
    duplicates: AtomicU64,
    errors: AtomicU64,
    failures: AtomicU64,
    expanded: AtomicU64,
    bytes: AtomicU64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reported entry. Hard-link duplicates reported as links count as links.
    pub fn record_entry(&self, kind: EntryKind, as_link: bool, size: u64) {
        let counter = match kind {
            _ if as_link => &self.links,
            EntryKind::File => {
                self.bytes.fetch_add(size, Ordering::Relaxed);
                &self.files
            }
            EntryKind::Directory => &self.directories,
            EntryKind::Symlink => &self.links,
            EntryKind::Other => &self.others,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expanded(&self) {
        self.expanded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn entries(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
            + self.directories.load(Ordering::Relaxed)
            + self.links.load(Ordering::Relaxed)
            + self.others.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn summary(&self, elapsed: Duration, stopped: bool) -> WalkSummary {
        WalkSummary {
            files: self.files.load(Ordering::Relaxed),
            directories: self.directories.load(Ordering::Relaxed),
            links: self.links.load(Ordering::Relaxed),
            others: self.others.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            expanded: self.expanded.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            elapsed,
            stopped,
        }
    }
}

/// Scheduler-side bookkeeping: issued vs completed tasks and the state machine.
///
/// Owned by the driver task only; published through a watch channel.
#[derive(Debug)]
pub(crate) struct RunState {
    start_time: Instant,
    state: WalkState,
    issued: u64,
    completed: u64,
    progress_tx: watch::Sender<WalkProgress>,
}

impl RunState {
    pub fn new(progress_tx: watch::Sender<WalkProgress>) -> Self {
        Self {
            start_time: Instant::now(),
            state: WalkState::Idle,
            issued: 0,
            completed: 0,
            progress_tx,
        }
    }

    pub fn issue(&mut self) {
        self.issued += 1;
    }

    pub fn complete(&mut self) {
        self.completed += 1;
    }

    /// Whether every issued task has completed.
    pub fn is_settled(&self) -> bool {
        self.issued == self.completed
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Move to `state` and publish a fresh snapshot.
    ///
    /// `Ended` is terminal; later transitions are ignored.
    pub fn transition(&mut self, state: WalkState, queued: usize, tracker: &ProgressTracker) {
        if self.state == WalkState::Ended {
            return;
        }
        if self.state != state {
            tracing::trace!(from = %self.state, to = %state, "walk state change");
        }
        self.state = state;
        self.progress_tx.send_replace(WalkProgress {
            state,
            tasks_issued: self.issued,
            tasks_completed: self.completed,
            tasks_queued: queued,
            entries: tracker.entries(),
            failures: tracker.failures(),
            elapsed: self.elapsed(),
        });
    }
}
