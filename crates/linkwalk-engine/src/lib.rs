//! Asynchronous traversal engine for linkwalk.
//!
//! # Overview
//!
//! `linkwalk-engine` walks a directory tree and reports every entry it finds
//! as a stream of [`WalkEvent`]s. Key features:
//!
//! - **Concurrent expansion** of sibling directories on the tokio runtime
//! - **Hard-link deduplication** by device/inode identity, per run
//! - **Partial failures** reported as events, never aborting the walk
//! - **Cancellation** via [`WalkHandle::stop`], always followed by `End`
//!
//! # Example
//!
//! ```rust,no_run
//! use linkwalk_engine::{walk, WalkConfig, WalkEvent};
//!
//! # async fn run() {
//! let config = WalkConfig::builder()
//!     .report_hard_links(true)
//!     .build()
//!     .unwrap();
//!
//! let mut handle = walk("/path/to/walk", config);
//! while let Some(event) = handle.recv().await {
//!     match event {
//!         WalkEvent::File(entry) => println!("file {}", entry.path.display()),
//!         WalkEvent::Link(entry) => println!("link {}", entry.path.display()),
//!         WalkEvent::End(summary) => println!("{summary}"),
//!         _ => {}
//!     }
//! }
//! # }
//! ```
//!
//! # Custom filesystems
//!
//! The engine only talks to the filesystem through [`FileSystem`]. Use
//! [`Walker::with_fs`] to walk anything that can be probed and listed.

mod emitter;
mod engine;
mod fs;
mod handle;
mod progress;
mod registry;

pub use engine::{DEFAULT_FAN_OUT, Walker, collect_paths, walk};
pub use fs::{FileSystem, LocalFs};
pub use handle::{StopHandle, WalkHandle};
pub use progress::{WalkProgress, WalkState};
pub use registry::{Classification, LinkRegistry};

// Re-export core types for convenience
pub use linkwalk_core::{
    EntryKind, EntryRecord, EventKind, EventMask, Failure, FailureKind, InodeInfo, Timestamps,
    WalkConfig, WalkConfigBuilder, WalkError, WalkEvent, WalkSummary,
};
