use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiftError {
    // Input
    #[error("please enter a file name")]
    EmptyPattern,

    #[error("root folder not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("root is not a folder: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("root folder is not readable: {}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Traversal
    #[error("permission denied")]
    PermissionDenied(PathBuf),

    #[error("symlink loop")]
    SymlinkLoop(PathBuf),

    #[error("IO error")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walk error: {0}")]
    Walk(String),

    // Runtime
    #[error("no observer registered")]
    NoObserver,

    #[error("failed to spawn search thread")]
    Spawn(#[source] std::io::Error),

    #[error("search thread panicked")]
    SessionPanicked,
}

impl SiftError {
    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::RootNotFound(p)
            | Self::NotADirectory(p)
            | Self::RootUnreadable { path: p, .. }
            | Self::PermissionDenied(p)
            | Self::SymlinkLoop(p)
            | Self::Io { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether this error rejects the request itself.
    ///
    /// These are returned synchronously from [`Worker::start`](crate::Worker::start)
    /// before any session exists, and are meant to be shown to the user.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::EmptyPattern
                | Self::RootNotFound(_)
                | Self::NotADirectory(_)
                | Self::RootUnreadable { .. }
        )
    }

    /// Whether the search can continue after this error.
    ///
    /// Recoverable errors are per-entry traversal failures. The session skips
    /// the entry, counts it in [`ScanStats::skipped`](crate::ScanStats::skipped)
    /// and keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_) | Self::SymlinkLoop(_) | Self::Io { .. } | Self::Walk(_)
        )
    }
}
