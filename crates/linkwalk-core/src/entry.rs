//! Probed entry records.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use strum::Display;

/// Inode information for hardlink detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InodeInfo {
    /// Inode number.
    pub inode: u64,
    /// Device ID.
    pub device: u64,
}

impl InodeInfo {
    /// Create new inode info.
    pub fn new(inode: u64, device: u64) -> Self {
        Self { inode, device }
    }
}

/// File metadata timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    /// Last modification time.
    pub modified: SystemTime,
    /// Last access time (if available).
    pub accessed: Option<SystemTime>,
    /// Creation time (if available, platform-dependent).
    pub created: Option<SystemTime>,
}

impl Timestamps {
    /// Create timestamps with only modified time.
    pub fn with_modified(modified: SystemTime) -> Self {
        Self {
            modified,
            accessed: None,
            created: None,
        }
    }

    /// Create timestamps with all available times.
    pub fn new(
        modified: SystemTime,
        accessed: Option<SystemTime>,
        created: Option<SystemTime>,
    ) -> Self {
        Self {
            modified,
            accessed,
            created,
        }
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::with_modified(SystemTime::UNIX_EPOCH)
    }
}

/// Type of a probed filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link (not resolved).
    Symlink,
    /// Sockets, fifos, block and character devices.
    Other,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, EntryKind::Symlink)
    }
}

/// The result of probing one filesystem path.
///
/// Records are produced by the prober and travel unchanged inside walk
/// events. The `depth` and `followed` fields are filled in by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    /// Path of the entry as discovered (never the resolved symlink target).
    pub path: PathBuf,

    /// Kind of the entry.
    pub kind: EntryKind,

    /// Device/inode identity, when the filesystem exposes one.
    pub inode: Option<InodeInfo>,

    /// Number of hard-link names pointing at the inode.
    pub link_count: u64,

    /// Size in bytes.
    pub size: u64,

    /// Metadata timestamps.
    pub timestamps: Timestamps,

    /// Distance from the walk root (root = 0).
    pub depth: u32,

    /// Whether this record describes the target of a followed symlink.
    #[serde(default)]
    pub followed: bool,

    /// Symlink target text, for symlinks whose target could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_target: Option<PathBuf>,
}

impl EntryRecord {
    /// Create a record with no identity and a single link.
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
            inode: None,
            link_count: 1,
            size: 0,
            timestamps: Timestamps::default(),
            depth: 0,
            followed: false,
            link_target: None,
        }
    }

    /// Attach device/inode identity and the hard-link count.
    pub fn with_identity(mut self, inode: InodeInfo, link_count: u64) -> Self {
        self.inode = Some(inode);
        self.link_count = link_count;
        self
    }

    /// Set the size in bytes.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Set the timestamps.
    pub fn with_timestamps(mut self, timestamps: Timestamps) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Set the symlink target text.
    pub fn with_link_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.link_target = Some(target.into());
        self
    }

    /// Final path component, or the whole path for roots like `/`.
    pub fn name(&self) -> &OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }

    /// Path of the entry.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the entry can take part in hard-link deduplication.
    pub fn is_link_eligible(&self) -> bool {
        self.inode.is_some() && self.link_count >= 2
    }
}
