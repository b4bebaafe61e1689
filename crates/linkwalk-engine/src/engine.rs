//! Work-queue traversal engine.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use linkwalk_core::{EntryRecord, EventKind, InodeInfo, WalkConfig, WalkError, WalkEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::emitter::Emitter;
use crate::fs::{FileSystem, LocalFs};
use crate::handle::WalkHandle;
use crate::progress::{RunState, WalkProgress, WalkState};
use crate::registry::{Classification, LinkRegistry};

/// Directories expanded concurrently when the config leaves it at 0.
pub const DEFAULT_FAN_OUT: usize = 16;

/// Smallest event channel the engine creates.
const MIN_CHANNEL_CAPACITY: usize = 2;

/// Walk `root` on the local filesystem.
///
/// Must be called from within a tokio runtime.
pub fn walk(root: impl Into<PathBuf>, config: WalkConfig) -> WalkHandle {
    Walker::new(config).walk(root)
}

/// Walk `root` to completion and return the path of every reported entry.
pub async fn collect_paths(root: impl Into<PathBuf>, mut config: WalkConfig) -> Vec<PathBuf> {
    config.events = config.events.with(EventKind::Path);
    let mut handle = walk(root, config);
    let mut paths = Vec::new();

    while let Some(event) = handle.recv().await {
        if let WalkEvent::Path(entry) = event {
            paths.push(entry.path.clone());
        }
    }

    paths
}

/// Starts traversal runs over a [`FileSystem`].
///
/// A walker can start any number of runs; each run gets its own link
/// registry, so concurrent walks never share hard-link state.
#[derive(Debug, Clone)]
pub struct Walker<F = LocalFs> {
    fs: Arc<F>,
    config: WalkConfig,
}

impl Walker<LocalFs> {
    /// Create a walker over the local filesystem.
    pub fn new(config: WalkConfig) -> Self {
        Self::with_fs(LocalFs::new(), config)
    }
}

impl<F: FileSystem> Walker<F> {
    /// Create a walker over a custom filesystem.
    pub fn with_fs(fs: F, config: WalkConfig) -> Self {
        Self {
            fs: Arc::new(fs),
            config,
        }
    }

    /// The configuration used for new runs.
    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// Start a run at `root` and return its event handle.
    ///
    /// Must be called from within a tokio runtime.
    pub fn walk(&self, root: impl Into<PathBuf>) -> WalkHandle {
        // An entry reserves two adjacent slots
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(MIN_CHANNEL_CAPACITY));
        let (progress_tx, progress_rx) = watch::channel(WalkProgress::default());
        let cancel = CancellationToken::new();

        let ctx = Arc::new(WalkContext {
            fs: Arc::clone(&self.fs),
            registry: LinkRegistry::new(),
            emitter: Emitter::new(tx, self.config.events, cancel.clone()),
            cancel: cancel.clone(),
            config: self.config.clone(),
        });

        tokio::spawn(run(ctx, root.into(), RunState::new(progress_tx)));

        WalkHandle::new(rx, cancel, progress_rx)
    }
}

/// One directory awaiting expansion.
#[derive(Debug, Clone)]
struct TraversalTask {
    path: PathBuf,
    depth: u32,
    ancestors: Ancestors,
}

/// Persistent chain of directory identities from the root to a task.
///
/// Only populated when symlinks are followed; siblings share their common
/// prefix.
#[derive(Debug, Clone, Default)]
struct Ancestors(Option<Arc<AncestorNode>>);

#[derive(Debug)]
struct AncestorNode {
    inode: InodeInfo,
    parent: Option<Arc<AncestorNode>>,
}

impl Ancestors {
    fn push(&self, inode: Option<InodeInfo>) -> Self {
        match inode {
            Some(inode) => Self(Some(Arc::new(AncestorNode {
                inode,
                parent: self.0.clone(),
            }))),
            None => self.clone(),
        }
    }

    fn contains(&self, inode: &InodeInfo) -> bool {
        let mut node = self.0.as_deref();
        while let Some(current) = node {
            if current.inode == *inode {
                return true;
            }
            node = current.parent.as_deref();
        }
        false
    }
}

/// State shared by the driver and every expansion of one run.
struct WalkContext<F> {
    fs: Arc<F>,
    config: WalkConfig,
    registry: LinkRegistry,
    emitter: Emitter,
    cancel: CancellationToken,
}

impl<F: FileSystem> WalkContext<F> {
    fn fan_out(&self) -> usize {
        match self.config.concurrency {
            0 => DEFAULT_FAN_OUT,
            n => n,
        }
    }

    /// Probe the root. Returns the first task when the root is a directory.
    ///
    /// A relative root is anchored at the current directory first, without
    /// resolving symlinks.
    async fn start(&self, root: PathBuf) -> Option<TraversalTask> {
        if self.cancel.is_cancelled() {
            return None;
        }

        let root = match std::path::absolute(&root) {
            Ok(absolute) => absolute,
            Err(err) => {
                debug!(path = %root.display(), error = %err, "failed to make root absolute");
                self.emitter.failure(root.clone(), WalkError::io(&root, err)).await;
                return None;
            }
        };

        let mut record = match self.fs.probe(&root).await {
            Ok(record) => record,
            Err(err) => {
                debug!(path = %root.display(), error = %err, "failed to probe root");
                self.emitter.failure(root.clone(), WalkError::io(&root, err)).await;
                return None;
            }
        };

        if record.kind.is_symlink() && self.config.follow_symlinks {
            if self.cancel.is_cancelled() {
                return None;
            }
            record = match self.follow(record).await {
                Ok(target) => target,
                Err(err) => {
                    self.emitter.failure(root, err).await;
                    return None;
                }
            };
        }

        if !record.kind.is_dir() {
            self.emitter.entry(record, false).await;
            return None;
        }

        let task = TraversalTask {
            path: root,
            depth: 0,
            ancestors: self.ancestry(&Ancestors::default(), record.inode),
        };
        self.emitter.root(record).await;
        Some(task)
    }

    /// List one directory and dispatch each child in listing order.
    async fn expand(&self, task: TraversalTask) -> Vec<TraversalTask> {
        if self.cancel.is_cancelled() {
            return Vec::new();
        }

        let names = match self.fs.list_dir(&task.path).await {
            Ok(names) => names,
            Err(err) => {
                debug!(path = %task.path.display(), error = %err, "failed to list directory");
                let error = WalkError::io(&task.path, err);
                self.emitter.failure(task.path, error).await;
                return Vec::new();
            }
        };

        self.emitter.expanded();
        trace!(path = %task.path.display(), depth = task.depth, children = names.len(), "listed directory");

        if names.is_empty() {
            self.emitter.empty(task.path).await;
            return Vec::new();
        }

        let mut subdirs = Vec::new();
        for name in names {
            if self.cancel.is_cancelled() {
                break;
            }
            if let Some(next) = self.visit(task.path.join(name), &task).await {
                subdirs.push(next);
            }
        }
        subdirs
    }

    /// Probe, classify and report one child. Returns a task if it should be expanded.
    async fn visit(&self, path: PathBuf, parent: &TraversalTask) -> Option<TraversalTask> {
        let depth = parent.depth + 1;

        let mut record = match self.fs.probe(&path).await {
            Ok(record) => record,
            Err(err) => {
                trace!(path = %path.display(), error = %err, "probe failed");
                let error = WalkError::io(&path, err);
                self.emitter.failure(path, error).await;
                return None;
            }
        };
        record.depth = depth;

        if record.kind.is_symlink() && self.config.follow_symlinks {
            if self.cancel.is_cancelled() {
                return None;
            }
            record = match self.follow(record).await {
                Ok(target) => target,
                Err(err) => {
                    self.emitter.failure(path, err).await;
                    return None;
                }
            };
        }

        // Followed symlink targets are not hard-link names
        if self.config.track_hard_links && !record.followed {
            if let Classification::DuplicateOf(canonical) = self.registry.classify(&record) {
                trace!(path = %record.path.display(), canonical = %canonical.display(), "hard link duplicate");
                if self.config.report_hard_links {
                    self.emitter.entry(record, true).await;
                } else {
                    self.emitter.duplicate();
                }
                return None;
            }
        }

        if !record.kind.is_dir() {
            self.emitter.entry(record, false).await;
            return None;
        }

        if self.config.follow_symlinks
            && record
                .inode
                .is_some_and(|inode| parent.ancestors.contains(&inode))
        {
            debug!(path = %record.path.display(), "symlink cycle, not expanding");
            self.emitter.cycle(record.path).await;
            return None;
        }

        let next = self.config.should_expand(depth).then(|| TraversalTask {
            path: record.path.clone(),
            depth,
            ancestors: self.ancestry(&parent.ancestors, record.inode),
        });
        self.emitter.entry(record, false).await;
        next
    }

    /// Replace a symlink record with the record of its target, keeping the link's path.
    async fn follow(&self, link: EntryRecord) -> Result<EntryRecord, WalkError> {
        let mut target = self
            .fs
            .resolve(&link.path)
            .await
            .map_err(|err| WalkError::io(&link.path, err))?;

        target.path = link.path;
        target.depth = link.depth;
        target.link_target = link.link_target;
        target.followed = true;
        Ok(target)
    }

    fn ancestry(&self, parent: &Ancestors, inode: Option<InodeInfo>) -> Ancestors {
        if self.config.follow_symlinks {
            parent.push(inode)
        } else {
            Ancestors::default()
        }
    }
}

/// Drive one run: seed from the root, keep up to `fan_out` expansions in
/// flight, and send `End` once the queue and the in-flight set are both empty.
async fn run<F: FileSystem>(ctx: Arc<WalkContext<F>>, root: PathBuf, mut state: RunState) {
    let tracker = ctx.emitter.tracker();
    state.transition(WalkState::Probing, 0, tracker);
    debug!(root = %root.display(), "walk started");

    if let Some(task) = ctx.start(root).await {
        let fan_out = ctx.fan_out();
        let mut queue = VecDeque::from([task]);
        let mut in_flight = JoinSet::new();

        loop {
            while in_flight.len() < fan_out && !ctx.cancel.is_cancelled() {
                let Some(task) = queue.pop_front() else {
                    break;
                };
                state.issue();
                let ctx = Arc::clone(&ctx);
                in_flight.spawn(async move { ctx.expand(task).await });
            }

            let phase = if queue.is_empty() {
                WalkState::Draining
            } else {
                WalkState::Expanding
            };
            state.transition(phase, queue.len(), tracker);

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            state.complete();

            match joined {
                Ok(children) if !ctx.cancel.is_cancelled() => queue.extend(children),
                Ok(_) => {}
                Err(err) => warn!(error = %err, "directory expansion task failed"),
            }
        }

        debug_assert!(state.is_settled());
    }

    let stopped = ctx.cancel.is_cancelled();
    let summary = tracker.summary(state.elapsed(), stopped);
    debug!(
        files = summary.files,
        directories = summary.directories,
        failures = summary.failures,
        stopped,
        "walk finished"
    );

    state.transition(WalkState::Ended, 0, tracker);
    ctx.emitter.end(summary).await;
}
