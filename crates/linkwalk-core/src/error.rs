//! Error types for walk operations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while walking.
///
/// None of these abort a run; the engine turns them into `Error` and `Fail`
/// events and moves on to the next entry.
#[derive(Debug, Error)]
pub enum WalkError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Following a symlink would re-enter a directory already being expanded.
    #[error("Symlink cycle detected at {path}")]
    CycleDetected { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl WalkError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Path the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::PermissionDenied { path }
            | Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::CycleDetected { path } => Some(path),
            Self::InvalidConfig { .. } => None,
        }
    }

    /// Failure category of this error.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::PermissionDenied { .. } => FailureKind::PermissionDenied,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::CycleDetected { .. } => FailureKind::CycleDetected,
            Self::Io { .. } | Self::InvalidConfig { .. } => FailureKind::Io,
        }
    }
}

/// Kind of walk failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The path vanished between listing and probing.
    NotFound,
    /// Probe or listing was disallowed.
    PermissionDenied,
    /// A followed symlink led back to one of its ancestors.
    CycleDetected,
    /// Any other filesystem failure.
    Io,
}

impl FailureKind {
    /// Whether failures of this kind are accompanied by an `Error` event.
    ///
    /// Vanished paths and symlink cycles only produce `Fail`.
    pub fn reports_error(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::Io)
    }
}

/// An entry that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Path where the failure occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of failure.
    pub kind: FailureKind,
}

impl Failure {
    /// Create a new failure.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a failure describing a walk error.
    pub fn from_error(path: impl Into<PathBuf>, error: &WalkError) -> Self {
        Self::new(path, error.to_string(), error.failure_kind())
    }

    /// Create a symlink cycle failure.
    pub fn cycle(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Symlink cycle detected at {}", path.display()),
            path,
            kind: FailureKind::CycleDetected,
        }
    }
}
