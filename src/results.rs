use std::path::PathBuf;
use std::time::Duration;

/// The output of a completed session.
///
/// Delivered exactly once through [`Observer::on_complete`](crate::Observer::on_complete).
/// The worker keeps no reference to it afterwards.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    /// Absolute paths of matching files, in traversal order.
    pub paths: Vec<PathBuf>,

    /// Scan statistics for the session.
    pub stats: ScanStats,
}

impl SearchResult {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }

    /// Drop the statistics and keep only the matched paths.
    pub fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}

impl IntoIterator for SearchResult {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.into_iter()
    }
}

impl<'a> IntoIterator for &'a SearchResult {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Statistics for a finished scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanStats {
    /// Regular files found by the count phase.
    pub files: u64,

    /// Regular files visited by the scan phase. Differs from `files` only
    /// when the tree changed between the two passes.
    pub scanned: u64,

    /// Directories visited by the scan phase, root included.
    pub dirs: u64,

    /// Entries the scan phase could not read and skipped.
    pub skipped: u64,

    /// Wall-clock time from session start to completion.
    pub duration: Duration,

    /// Scanned files per second, 0 on zero-duration runs.
    pub files_per_sec: u64,
}

impl ScanStats {
    pub(crate) fn compute(
        files: u64,
        scanned: u64,
        dirs: u64,
        skipped: u64,
        duration: Duration,
    ) -> Self {
        let fps = if duration.as_secs_f64() > 0.0 {
            (scanned as f64 / duration.as_secs_f64()) as u64
        } else {
            0
        };
        Self {
            files,
            scanned,
            dirs,
            skipped,
            duration,
            files_per_sec: fps,
        }
    }
}
