//! Walk configuration types.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::event::EventMask;

/// Default capacity of the bounded event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Configuration for one traversal run.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct WalkConfig {
    /// Report hard-link duplicates as `Link` events instead of suppressing them.
    #[builder(default = "false")]
    #[serde(default)]
    pub report_hard_links: bool,

    /// Deepest directory depth that is still expanded (None = unlimited).
    ///
    /// Directories beyond the limit are reported but not listed.
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Follow symbolic links that resolve to directories.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Deduplicate hard links by device/inode identity.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub track_hard_links: bool,

    /// Maximum directories expanded concurrently (0 = engine default).
    #[builder(default = "0")]
    #[serde(default)]
    pub concurrency: usize,

    /// Event kinds delivered to the caller.
    #[builder(default)]
    #[serde(default)]
    pub events: EventMask,

    /// Capacity of the bounded event channel. The engine uses at least two slots.
    #[builder(default = "DEFAULT_CHANNEL_CAPACITY")]
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl WalkConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.channel_capacity == Some(0) {
            return Err("Channel capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

impl WalkConfig {
    /// Create a new walk config builder.
    pub fn builder() -> WalkConfigBuilder {
        WalkConfigBuilder::default()
    }

    /// Create a config with every option at its default.
    pub fn new() -> Self {
        Self {
            report_hard_links: false,
            max_depth: None,
            follow_symlinks: false,
            track_hard_links: true,
            concurrency: 0,
            events: EventMask::all(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Check if a directory discovered at `depth` may be expanded.
    pub fn should_expand(&self, depth: u32) -> bool {
        self.max_depth.is_none_or(|max| depth <= max)
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self::new()
    }
}
