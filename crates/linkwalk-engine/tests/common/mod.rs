//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use linkwalk_engine::{EntryKind, EntryRecord, EventKind, FileSystem, InodeInfo, WalkEvent};

const DEVICE: u64 = 1;
const MAX_SYMLINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
struct MemNode {
    kind: EntryKind,
    inode: u64,
    size: u64,
    target: Option<PathBuf>,
}

/// In-memory filesystem with injectable failures.
///
/// Children are listed in insertion order.
#[derive(Debug, Default)]
pub struct MemFs {
    nodes: HashMap<PathBuf, MemNode>,
    children: HashMap<PathBuf, Vec<OsString>>,
    probe_failures: HashMap<PathBuf, io::ErrorKind>,
    list_failures: HashMap<PathBuf, io::ErrorKind>,
    next_inode: u64,
}

impl MemFs {
    /// Create a filesystem holding only the directory `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let mut fs = Self {
            next_inode: 1,
            ..Default::default()
        };
        fs.insert(root.as_ref(), EntryKind::Directory, None, 0);
        fs
    }

    pub fn dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), EntryKind::Directory, None, 0);
        self
    }

    pub fn file(mut self, path: impl AsRef<Path>, size: u64) -> Self {
        self.insert(path.as_ref(), EntryKind::File, None, size);
        self
    }

    pub fn socket(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), EntryKind::Other, None, 0);
        self
    }

    pub fn symlink(mut self, path: impl AsRef<Path>, target: impl Into<PathBuf>) -> Self {
        self.insert(path.as_ref(), EntryKind::Symlink, Some(target.into()), 0);
        self
    }

    /// Add another name for the inode at `existing`.
    pub fn hard_link(mut self, existing: impl AsRef<Path>, path: impl AsRef<Path>) -> Self {
        let node = self.nodes[existing.as_ref()].clone();
        self.attach(path.as_ref(), node);
        self
    }

    pub fn fail_probe(mut self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.probe_failures.insert(path.into(), kind);
        self
    }

    pub fn fail_list(mut self, path: impl Into<PathBuf>, kind: io::ErrorKind) -> Self {
        self.list_failures.insert(path.into(), kind);
        self
    }

    fn insert(&mut self, path: &Path, kind: EntryKind, target: Option<PathBuf>, size: u64) {
        let node = MemNode {
            kind,
            inode: self.next_inode,
            size,
            target,
        };
        self.next_inode += 1;
        self.attach(path, node);
    }

    fn attach(&mut self, path: &Path, node: MemNode) {
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            if let Some(siblings) = self.children.get_mut(parent) {
                siblings.push(name.to_os_string());
            }
        }
        if node.kind.is_dir() {
            self.children.entry(path.to_path_buf()).or_default();
        }
        self.nodes.insert(path.to_path_buf(), node);
    }

    fn record(&self, path: &Path, node: &MemNode) -> EntryRecord {
        let links = match node.kind {
            EntryKind::Directory => 2,
            _ => self.nodes.values().filter(|n| n.inode == node.inode).count() as u64,
        };
        let record = EntryRecord::new(path, node.kind)
            .with_identity(InodeInfo::new(node.inode, DEVICE), links)
            .with_size(node.size);
        match &node.target {
            Some(target) => record.with_link_target(target),
            None => record,
        }
    }

    /// Rewrite every symlinked directory component of `path` to its target.
    fn through_links(&self, path: &Path) -> PathBuf {
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            let mut hops = 0;
            while let Some(target) = self.nodes.get(&current).and_then(|n| n.target.as_ref()) {
                if hops == MAX_SYMLINK_HOPS {
                    break;
                }
                current = target.clone();
                hops += 1;
            }
        }
        current
    }

    /// Lstat-style lookup: the final component is not followed.
    fn lookup(&self, path: &Path) -> io::Result<&MemNode> {
        if let Some(kind) = self.probe_failures.get(path) {
            return Err(io::Error::new(*kind, "injected probe failure"));
        }
        let real = match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => self.through_links(parent).join(name),
            _ => path.to_path_buf(),
        };
        self.nodes
            .get(&real)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such entry"))
    }
}

impl FileSystem for MemFs {
    async fn probe(&self, path: &Path) -> io::Result<EntryRecord> {
        let node = self.lookup(path)?;
        Ok(self.record(path, node))
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        if let Some(kind) = self.list_failures.get(path) {
            return Err(io::Error::new(*kind, "injected listing failure"));
        }
        self.children
            .get(&self.through_links(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not a directory"))
    }

    async fn resolve(&self, path: &Path) -> io::Result<EntryRecord> {
        let mut current = path.to_path_buf();
        for _ in 0..MAX_SYMLINK_HOPS {
            let node = self.lookup(&current)?;
            match &node.target {
                Some(target) => current = target.clone(),
                None => return Ok(self.record(path, node)),
            }
        }
        Err(io::Error::other("too many levels of symbolic links"))
    }
}

/// (kind, path) of every event except `End`.
pub fn pairs(events: &[WalkEvent]) -> Vec<(EventKind, PathBuf)> {
    events
        .iter()
        .filter_map(|event| event.path().map(|path| (event.kind(), path.to_path_buf())))
        .collect()
}

/// Paths of every event of one kind, in arrival order.
pub fn paths_of(events: &[WalkEvent], kind: EventKind) -> Vec<PathBuf> {
    pairs(events)
        .into_iter()
        .filter(|(k, _)| *k == kind)
        .map(|(_, path)| path)
        .collect()
}

/// Number of events of one kind.
pub fn count(events: &[WalkEvent], kind: EventKind) -> usize {
    events.iter().filter(|event| event.kind() == kind).count()
}

/// Assert that exactly one `End` arrived and that it came last; return its summary.
pub fn assert_single_end(events: &[WalkEvent]) -> &linkwalk_engine::WalkSummary {
    assert_eq!(count(events, EventKind::End), 1, "expected exactly one End");
    match events.last() {
        Some(WalkEvent::End(summary)) => summary,
        other => panic!("End was not the last event: {other:?}"),
    }
}
