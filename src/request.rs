use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::SiftError;

/// What to look for and where.
///
/// A request is immutable once handed to [`Worker::start`](crate::Worker::start);
/// the session thread takes ownership of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pattern: String,
    root: PathBuf,
}

impl SearchRequest {
    pub fn new(pattern: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            pattern: pattern.into(),
            root: root.into(),
        }
    }

    /// Substring matched against each file's base name (case-sensitive).
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Directory the traversal starts from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check the request and make the root absolute.
    ///
    /// Runs on the caller's thread so bad input is reported before any
    /// session is created.
    pub(crate) fn resolve(self) -> Result<Self, SiftError> {
        if self.pattern.is_empty() {
            return Err(SiftError::EmptyPattern);
        }

        let metadata = match fs::metadata(&self.root) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SiftError::RootNotFound(self.root));
            }
            Err(source) => {
                return Err(SiftError::RootUnreadable {
                    path: self.root,
                    source,
                });
            }
        };
        if !metadata.is_dir() {
            return Err(SiftError::NotADirectory(self.root));
        }

        // Opening the directory is the cheapest way to prove it is listable.
        if let Err(source) = fs::read_dir(&self.root) {
            return Err(SiftError::RootUnreadable {
                path: self.root,
                source,
            });
        }

        let root = fs::canonicalize(&self.root).map_err(|source| SiftError::RootUnreadable {
            path: self.root.clone(),
            source,
        })?;

        Ok(Self {
            pattern: self.pattern,
            root,
        })
    }
}
