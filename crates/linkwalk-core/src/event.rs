//! Walk events and the end-of-run summary.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::entry::EntryRecord;
use crate::error::{Failure, WalkError};

/// Notification delivered by a running walk.
///
/// Entry-carrying events share one [`EntryRecord`] allocation, since every
/// reported entry produces a [`WalkEvent::Path`] followed by its
/// kind-specific event.
#[derive(Debug)]
pub enum WalkEvent {
    /// The root is a directory; sent once, before anything else.
    Root(Arc<EntryRecord>),
    /// Any reported entry, sent immediately before its kind-specific event.
    Path(Arc<EntryRecord>),
    /// A regular file.
    File(Arc<EntryRecord>),
    /// A directory, or a followed symlink that resolves to one.
    Directory(Arc<EntryRecord>),
    /// An unfollowed symlink, or a reported hard-link duplicate.
    Link(Arc<EntryRecord>),
    /// A socket, fifo or device node.
    Other(Arc<EntryRecord>),
    /// A directory whose listing succeeded with no children.
    Empty(PathBuf),
    /// A probe or listing failed with a retrievable cause.
    Error { path: PathBuf, error: WalkError },
    /// An entry could not be completed.
    Fail(Failure),
    /// The run is over. Always the last event, sent exactly once.
    End(WalkSummary),
}

impl WalkEvent {
    /// Kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Root(_) => EventKind::Root,
            Self::Path(_) => EventKind::Path,
            Self::File(_) => EventKind::File,
            Self::Directory(_) => EventKind::Directory,
            Self::Link(_) => EventKind::Link,
            Self::Other(_) => EventKind::Other,
            Self::Empty(_) => EventKind::Empty,
            Self::Error { .. } => EventKind::Error,
            Self::Fail(_) => EventKind::Fail,
            Self::End(_) => EventKind::End,
        }
    }

    /// The entry record carried by this event, if any.
    pub fn entry(&self) -> Option<&EntryRecord> {
        match self {
            Self::Root(entry)
            | Self::Path(entry)
            | Self::File(entry)
            | Self::Directory(entry)
            | Self::Link(entry)
            | Self::Other(entry) => Some(entry),
            _ => None,
        }
    }

    /// The path this event is about. `End` has none.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Empty(path) | Self::Error { path, .. } => Some(path),
            Self::Fail(failure) => Some(&failure.path),
            Self::End(_) => None,
            _ => self.entry().map(EntryRecord::path),
        }
    }

    /// Check if this is the terminal event.
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End(_))
    }
}

/// Discriminant of [`WalkEvent`], used for subscriptions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Root,
    Path,
    File,
    Directory,
    Link,
    Other,
    Empty,
    Error,
    Fail,
    End,
}

bitflags! {
    /// Set of event kinds a caller subscribes to.
    ///
    /// `End` is always delivered regardless of the mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EventMask: u16 {
        const ROOT      = 1 << 0;
        const PATH      = 1 << 1;
        const FILE      = 1 << 2;
        const DIRECTORY = 1 << 3;
        const LINK      = 1 << 4;
        const OTHER     = 1 << 5;
        const EMPTY     = 1 << 6;
        const ERROR     = 1 << 7;
        const FAIL      = 1 << 8;
        const END       = 1 << 9;
    }
}

impl From<EventKind> for EventMask {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Root => Self::ROOT,
            EventKind::Path => Self::PATH,
            EventKind::File => Self::FILE,
            EventKind::Directory => Self::DIRECTORY,
            EventKind::Link => Self::LINK,
            EventKind::Other => Self::OTHER,
            EventKind::Empty => Self::EMPTY,
            EventKind::Error => Self::ERROR,
            EventKind::Fail => Self::FAIL,
            EventKind::End => Self::END,
        }
    }
}

impl EventMask {
    /// Only `End`.
    pub fn none() -> Self {
        Self::END
    }

    /// Add a kind to the mask.
    pub fn with(self, kind: EventKind) -> Self {
        self | Self::from(kind)
    }

    /// Remove a kind from the mask. Removing `End` has no effect.
    pub fn without(self, kind: EventKind) -> Self {
        (self - Self::from(kind)) | Self::END
    }

    /// Check if a kind is delivered under this mask.
    pub fn subscribes(&self, kind: EventKind) -> bool {
        kind == EventKind::End || self.intersects(Self::from(kind))
    }

    /// Iterate over the subscribed kinds.
    pub fn kinds(&self) -> impl Iterator<Item = EventKind> {
        let mask = *self;
        EventKind::iter().filter(move |kind| mask.subscribes(*kind))
    }
}

impl Default for EventMask {
    fn default() -> Self {
        Self::all()
    }
}

impl FromIterator<EventKind> for EventMask {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

/// Totals for one traversal run, carried by [`WalkEvent::End`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkSummary {
    /// Regular files reported.
    pub files: u64,
    /// Directories reported (the root is not counted).
    pub directories: u64,
    /// Symlinks and hard-link duplicates reported as links.
    pub links: u64,
    /// Special entries reported.
    pub others: u64,
    /// Hard-link duplicates that were suppressed.
    pub duplicates: u64,
    /// `Error` events sent.
    pub errors: u64,
    /// `Fail` events sent.
    pub failures: u64,
    /// Directories whose children were listed.
    pub expanded: u64,
    /// Apparent size of every reported regular file.
    pub bytes: u64,
    /// Wall time from start to end.
    pub elapsed: Duration,
    /// Whether the run was cut short by a stop request.
    pub stopped: bool,
}

impl WalkSummary {
    /// Total entries reported, of every kind.
    pub fn entries(&self) -> u64 {
        self.files + self.directories + self.links + self.others
    }

    /// Check if the run completed without errors or failures.
    pub fn is_clean(&self) -> bool {
        self.errors == 0 && self.failures == 0
    }
}

impl fmt::Display for WalkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files, {} directories, {} links",
            self.files, self.directories, self.links
        )?;
        if self.others > 0 {
            write!(f, ", {} other", self.others)?;
        }
        if self.duplicates > 0 {
            write!(f, " ({} hard links skipped)", self.duplicates)?;
        }
        if !self.is_clean() {
            write!(f, ", {} errors, {} failed", self.errors, self.failures)?;
        }
        if self.stopped {
            write!(f, " [stopped]")?;
        }
        Ok(())
    }
}
