//! Hard-link registry for one traversal run.

use std::path::PathBuf;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use linkwalk_core::{EntryRecord, InodeInfo};

/// Outcome of classifying a probed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// First name seen for this identity, or not eligible for deduplication.
    Canonical,
    /// Another name for an identity first seen at the given path.
    DuplicateOf(PathBuf),
}

impl Classification {
    /// Check if the entry is canonical.
    pub fn is_canonical(&self) -> bool {
        matches!(self, Self::Canonical)
    }
}

/// Maps (device, inode) pairs to the first path discovered for them.
///
/// Entries are never overwritten: the first path recorded for an identity
/// stays canonical for the rest of the run. Classification is an atomic
/// insert-if-absent, so concurrent expansions never lose an update.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    seen: DashMap<InodeInfo, PathBuf>,
}

impl LinkRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            seen: DashMap::new(),
        }
    }

    /// Classify a probed entry, recording it if it is the first of its identity.
    ///
    /// Directories, entries without identity and entries with a single link
    /// are always canonical and never recorded.
    pub fn classify(&self, record: &EntryRecord) -> Classification {
        if record.kind.is_dir() || !record.is_link_eligible() {
            return Classification::Canonical;
        }
        let Some(info) = record.inode else {
            return Classification::Canonical;
        };

        match self.seen.entry(info) {
            Entry::Occupied(existing) => Classification::DuplicateOf(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(record.path.clone());
                Classification::Canonical
            }
        }
    }

    /// Get the canonical path recorded for an identity.
    pub fn canonical_path(&self, info: &InodeInfo) -> Option<PathBuf> {
        self.seen.get(info).map(|path| path.clone())
    }

    /// Get the number of identities recorded.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if no identities have been recorded.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkwalk_core::EntryKind;
    use std::sync::Arc;

    fn linked_file(path: &str, inode: u64, device: u64) -> EntryRecord {
        EntryRecord::new(path, EntryKind::File).with_identity(InodeInfo::new(inode, device), 3)
    }

    #[test]
    fn test_first_seen_is_canonical() {
        let registry = LinkRegistry::new();

        assert!(registry.classify(&linked_file("/a", 1, 1)).is_canonical());
        assert_eq!(
            registry.classify(&linked_file("/b", 1, 1)),
            Classification::DuplicateOf(PathBuf::from("/a"))
        );
        assert_eq!(
            registry.classify(&linked_file("/c", 1, 1)),
            Classification::DuplicateOf(PathBuf::from("/a"))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_different_devices() {
        let registry = LinkRegistry::new();

        assert!(registry.classify(&linked_file("/a", 12345, 1)).is_canonical());
        // Same inode, different device
        assert!(registry.classify(&linked_file("/b", 12345, 2)).is_canonical());
    }

    #[test]
    fn test_single_link_not_recorded() {
        let registry = LinkRegistry::new();
        let record = EntryRecord::new("/a", EntryKind::File).with_identity(InodeInfo::new(9, 1), 1);

        assert!(registry.classify(&record).is_canonical());
        assert!(registry.classify(&record).is_canonical());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_identity_is_canonical() {
        let registry = LinkRegistry::new();
        let mut record = EntryRecord::new("/a", EntryKind::File);
        record.link_count = 4;

        assert!(registry.classify(&record).is_canonical());
        assert!(registry.classify(&record).is_canonical());
    }

    #[test]
    fn test_directories_never_deduplicated() {
        let registry = LinkRegistry::new();
        let dir = |path: &str| {
            EntryRecord::new(path, EntryKind::Directory).with_identity(InodeInfo::new(5, 1), 2)
        };

        assert!(registry.classify(&dir("/d")).is_canonical());
        assert!(registry.classify(&dir("/d2")).is_canonical());
        assert!(registry.canonical_path(&InodeInfo::new(5, 1)).is_none());
    }

    #[test]
    fn test_concurrent_classify_has_one_winner() {
        let registry = Arc::new(LinkRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry
                        .classify(&linked_file(&format!("/name{i}"), 77, 1))
                        .is_canonical()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|canonical| *canonical)
            .count();

        assert_eq!(winners, 1);
        assert!(registry.canonical_path(&InodeInfo::new(77, 1)).is_some());
    }
}
