//! Filesystem primitives required by the engine.

use std::ffi::OsString;
use std::fs::Metadata;
use std::future::Future;
use std::io;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use linkwalk_core::{EntryKind, EntryRecord, InodeInfo, Timestamps};

/// The operations a walk needs from its environment.
///
/// Every call may fail independently; the engine reports failures as events
/// and carries on with the next entry.
pub trait FileSystem: Send + Sync + 'static {
    /// Probe `path` without following a final symlink (lstat semantics).
    fn probe(&self, path: &Path) -> impl Future<Output = io::Result<EntryRecord>> + Send;

    /// List the child names of a directory, in the order the source returns them.
    fn list_dir(&self, path: &Path) -> impl Future<Output = io::Result<Vec<OsString>>> + Send;

    /// Probe the target of the symlink at `path`, following every link.
    ///
    /// Only called when symlink following is enabled.
    fn resolve(&self, path: &Path) -> impl Future<Output = io::Result<EntryRecord>> + Send;
}

/// The local filesystem, accessed through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    /// Create a new local filesystem handle.
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFs {
    async fn probe(&self, path: &Path) -> io::Result<EntryRecord> {
        let metadata = tokio::fs::symlink_metadata(path).await?;
        let record = record_from_metadata(path, &metadata);

        if record.kind.is_symlink() {
            // Unreadable targets are not a probe failure
            if let Ok(target) = tokio::fs::read_link(path).await {
                return Ok(record.with_link_target(target));
            }
        }

        Ok(record)
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name());
        }

        Ok(names)
    }

    async fn resolve(&self, path: &Path) -> io::Result<EntryRecord> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(record_from_metadata(path, &metadata))
    }
}

/// Build an entry record from metadata.
fn record_from_metadata(path: &Path, metadata: &Metadata) -> EntryRecord {
    let file_type = metadata.file_type();
    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        EntryKind::File
    } else {
        EntryKind::Other
    };

    let record = EntryRecord::new(path, kind)
        .with_size(metadata.len())
        .with_timestamps(Timestamps::new(
            metadata.modified().unwrap_or(std::time::UNIX_EPOCH),
            metadata.accessed().ok(),
            metadata.created().ok(),
        ));

    match get_identity(metadata) {
        Some((inode, links)) => record.with_identity(inode, links),
        None => record,
    }
}

// Cross-platform metadata helpers

/// Get the device/inode identity and hard-link count from metadata.
#[cfg(unix)]
fn get_identity(metadata: &Metadata) -> Option<(InodeInfo, u64)> {
    Some((InodeInfo::new(metadata.ino(), metadata.dev()), metadata.nlink()))
}

#[cfg(not(unix))]
fn get_identity(_metadata: &Metadata) -> Option<(InodeInfo, u64)> {
    None // No stable inode identity exposed through std
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_probe_kinds() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("dir")).unwrap();
        fs::write(root.join("file.txt"), "hello").unwrap();

        let fs = LocalFs::new();

        let dir = fs.probe(&root.join("dir")).await.unwrap();
        assert_eq!(dir.kind, EntryKind::Directory);

        let file = fs.probe(&root.join("file.txt")).await.unwrap();
        assert_eq!(file.kind, EntryKind::File);
        assert_eq!(file.size, 5);
        assert_eq!(file.path, root.join("file.txt"));
    }

    #[tokio::test]
    async fn test_probe_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = LocalFs::new()
            .probe(&temp.path().join("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "").unwrap();
        fs::write(temp.path().join("b"), "").unwrap();

        let mut names = LocalFs::new().list_dir(temp.path()).await.unwrap();
        names.sort();
        assert_eq!(names, vec![OsString::from("a"), OsString::from("b")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hard_link_identity() {
        let temp = TempDir::new().unwrap();
        let original = temp.path().join("original");
        let linked = temp.path().join("linked");
        fs::write(&original, "contents").unwrap();
        fs::hard_link(&original, &linked).unwrap();

        let fs = LocalFs::new();
        let a = fs.probe(&original).await.unwrap();
        let b = fs.probe(&linked).await.unwrap();

        assert_eq!(a.inode, b.inode);
        assert_eq!(a.link_count, 2);
        assert!(a.is_link_eligible());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_probe_and_resolve() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("target")).unwrap();
        std::os::unix::fs::symlink("target", temp.path().join("link")).unwrap();

        let fs = LocalFs::new();
        let link = fs.probe(&temp.path().join("link")).await.unwrap();
        assert_eq!(link.kind, EntryKind::Symlink);
        assert_eq!(link.link_target.as_deref(), Some(Path::new("target")));

        let resolved = fs.resolve(&temp.path().join("link")).await.unwrap();
        assert_eq!(resolved.kind, EntryKind::Directory);
    }
}
