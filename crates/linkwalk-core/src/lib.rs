//! Core types for linkwalk.
//!
//! This crate provides the data model shared by the traversal engine and its
//! callers: probed entry records, walk configuration, the event vocabulary,
//! and the error taxonomy. It performs no I/O.

mod config;
mod entry;
mod error;
mod event;

pub use config::{DEFAULT_CHANNEL_CAPACITY, WalkConfig, WalkConfigBuilder};
pub use entry::{EntryKind, EntryRecord, InodeInfo, Timestamps};
pub use error::{Failure, FailureKind, WalkError};
pub use event::{EventKind, EventMask, WalkEvent, WalkSummary};
