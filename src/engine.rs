use std::ffi::OsStr;
use std::fs::{self, FileType};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bstr::ByteSlice;
use ignore::{DirEntry, Walk, WalkBuilder};

use crate::error::SiftError;
use crate::request::SearchRequest;
use crate::results::{ScanStats, SearchResult};
use crate::session::{Gate, SessionId, SessionOutcome};
use crate::traits::Observer;

// ---------------------------------------------------------------------------
// WalkConfig
// ---------------------------------------------------------------------------

/// Traversal parameters passed from the builder to the engine.
///
/// `pub(crate)` — not part of the public API. Callers configure these
/// via the builder methods (`.follow_links()`, `.sort_by_name()`,
/// `.coalesce_progress()`).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WalkConfig {
    pub follow_links:      bool,
    pub sort_by_name:      bool,
    pub coalesce_progress: bool,
}

// ---------------------------------------------------------------------------
// Engine options
// ---------------------------------------------------------------------------

/// Everything one session needs, borrowed from the session thread.
pub(crate) struct EngineOptions<'a> {
    pub id:       SessionId,
    pub request:  &'a SearchRequest,
    pub config:   WalkConfig,
    pub observer: &'a dyn Observer,
    pub gate:     &'a Gate,
}

// ---------------------------------------------------------------------------
// run()
// ---------------------------------------------------------------------------

/// Execute one session: count, scan, deliver.
///
/// Called on the session thread with an already-validated request. Checks
/// the gate before every entry so a cancelled session stops within one
/// filesystem call.
pub(crate) fn run(opts: EngineOptions<'_>) -> SessionOutcome {
    let EngineOptions {
        id,
        request,
        config,
        observer,
        gate,
    } = opts;
    let root = request.root();
    let start = Instant::now();

    log::trace!("session {id}: counting files under {}", root.display());
    let Some(tally) = count_files(root, &config, gate) else {
        log::trace!("session {id}: cancelled during count");
        return SessionOutcome::Cancelled;
    };

    // Nothing to scan: report full progress once and finish empty.
    if tally.files == 0 {
        if !gate.deliver(|| observer.on_progress(id, 100)) {
            return SessionOutcome::Cancelled;
        }
        let result = SearchResult {
            paths: Vec::new(),
            stats: ScanStats::compute(0, 0, tally.dirs, tally.skipped, start.elapsed()),
        };
        return finish(id, gate, observer, result);
    }

    log::debug!(
        "session {id}: scanning {} files for {:?}",
        tally.files,
        request.pattern()
    );

    let mut paths:   Vec<PathBuf> = Vec::new();
    let mut scanned: u64 = 0;
    let mut dirs:    u64 = 0;
    let mut skipped: u64 = 0;
    let mut last:    Option<u8> = None;

    for res in walker(root, &config) {
        if !gate.is_live() {
            log::trace!("session {id}: cancelled after {scanned} files");
            return SessionOutcome::Cancelled;
        }

        let entry = match res {
            Ok(e) => e,
            Err(e) => {
                let err = map_ignore_error(e);
                match err.path() {
                    Some(p) => log::debug!("session {id}: skipped {}: {err}", p.display()),
                    None    => log::debug!("session {id}: skipped entry: {err}"),
                }
                skipped += 1;
                continue;
            }
        };

        let ft = match entry.file_type() {
            Some(ft) => ft,
            None     => continue,
        };
        if ft.is_dir() {
            dirs += 1;
            continue;
        }
        if !is_file_like(&entry, ft) {
            continue;
        }

        if name_matches(entry.file_name(), request.pattern()) {
            paths.push(entry.into_path());
        }

        scanned += 1;
        let pct = percent(scanned, tally.files);
        if config.coalesce_progress && last == Some(pct) {
            continue;
        }
        last = Some(pct);

        if !gate.deliver(|| observer.on_progress(id, pct)) {
            log::trace!("session {id}: cancelled at {pct}%");
            return SessionOutcome::Cancelled;
        }
    }

    let result = SearchResult {
        paths,
        stats: ScanStats::compute(tally.files, scanned, dirs, skipped, start.elapsed()),
    };
    finish(id, gate, observer, result)
}

fn finish(
    id: SessionId,
    gate: &Gate,
    observer: &dyn Observer,
    result: SearchResult,
) -> SessionOutcome {
    let matches = result.len();
    let stats = result.stats.clone();

    if !gate.complete(|| observer.on_complete(id, result)) {
        log::trace!("session {id}: cancelled before completion");
        return SessionOutcome::Cancelled;
    }

    log::debug!(
        "session {id}: {matches} matches in {} files, {} skipped, {:.3}s",
        stats.scanned,
        stats.skipped,
        stats.duration.as_secs_f64()
    );
    SessionOutcome::Completed
}

// ---------------------------------------------------------------------------
// Count phase
// ---------------------------------------------------------------------------

struct Tally {
    files:   u64,
    dirs:    u64,
    skipped: u64,
}

/// First pass: count regular files. `None` if the session was cancelled.
fn count_files(root: &Path, config: &WalkConfig, gate: &Gate) -> Option<Tally> {
    let mut tally = Tally {
        files:   0,
        dirs:    0,
        skipped: 0,
    };

    for res in walker(root, config) {
        if !gate.is_live() {
            return None;
        }
        match res {
            Ok(entry) => match entry.file_type() {
                Some(ft) if ft.is_dir() => tally.dirs += 1,
                Some(ft) if is_file_like(&entry, ft) => tally.files += 1,
                _ => {}
            },
            Err(_) => tally.skipped += 1,
        }
    }

    Some(tally)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Serial walk over every entry under `root`: hidden files included, no
/// ignore files honoured.
fn walker(root: &Path, config: &WalkConfig) -> Walk {
    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .ignore(false)
        .parents(false)
        .hidden(false)
        .follow_links(config.follow_links)
        .same_file_system(false);

    if config.sort_by_name {
        builder.sort_by_file_name(|a, b| a.cmp(b));
    }

    builder.build()
}

/// A regular file, or an unfollowed symlink whose target is one.
fn is_file_like(entry: &DirEntry, ft: FileType) -> bool {
    if ft.is_file() {
        return true;
    }
    ft.is_symlink() && fs::metadata(entry.path()).is_ok_and(|m| m.is_file())
}

/// Case-sensitive substring test on the raw file name bytes.
fn name_matches(name: &OsStr, pattern: &str) -> bool {
    name.as_encoded_bytes().contains_str(pattern)
}

/// `floor(scanned / total * 100)`, clamped so a tree that grew between the
/// two passes never reports more than 100.
fn percent(scanned: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (scanned.saturating_mul(100) / total).min(100) as u8
}

// ---------------------------------------------------------------------------
// Map ignore::Error to SiftError
// ---------------------------------------------------------------------------

fn map_ignore_error(e: ignore::Error) -> SiftError {
    match e {
        ignore::Error::WithPath { path, err } => match *err {
            ignore::Error::Io(io_err) => {
                if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                    SiftError::PermissionDenied(path)
                } else {
                    SiftError::Io { path, source: io_err }
                }
            }
            other => SiftError::Walk(format!("{}: {}", path.display(), other)),
        },
        ignore::Error::WithDepth { err, .. } => map_ignore_error(*err),
        ignore::Error::Loop { child, .. } => SiftError::SymlinkLoop(child),
        ignore::Error::Io(io_err)         => SiftError::Io {
            path:   PathBuf::new(),
            source: io_err,
        },
        other => SiftError::Walk(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        progress: AtomicUsize,
        complete: AtomicUsize,
    }

    impl Observer for Counter {
        fn on_progress(&self, _session: SessionId, _percent: u8) {
            self.progress.fetch_add(1, Ordering::SeqCst);
        }

        fn on_complete(&self, _session: SessionId, _result: SearchResult) {
            self.complete.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn cancelled_count_phase_delivers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            fs::write(dir.path().join(format!("f{i}.txt")), "").unwrap();
        }
        let request = SearchRequest::new("f", dir.path()).resolve().unwrap();
        let gate = Gate::new();
        gate.cancel();

        assert!(count_files(request.root(), &WalkConfig::default(), &gate).is_none());

        let counter = Counter::default();
        let outcome = run(EngineOptions {
            id:       SessionId(1),
            request:  &request,
            config:   WalkConfig::default(),
            observer: &counter,
            gate:     &gate,
        });
        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert_eq!(counter.progress.load(Ordering::SeqCst), 0);
        assert_eq!(counter.complete.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn percent_floors() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(1, 200), 0);
    }

    #[test]
    fn percent_clamps_when_tree_grew() {
        assert_eq!(percent(11, 10), 100);
    }

    #[test]
    fn percent_of_empty_total_is_full() {
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn name_match_is_case_sensitive_substring() {
        assert!(name_matches(OsStr::new("invoice_jan.txt"), "invoice"));
        assert!(name_matches(OsStr::new("my_invoice"), "voice"));
        assert!(!name_matches(OsStr::new("Invoice.txt"), "invoice"));
        assert!(!name_matches(OsStr::new("report.txt"), "invoice"));
    }

    #[test]
    fn maps_permission_denied_with_path() {
        let err = ignore::Error::WithPath {
            path: PathBuf::from("/locked"),
            err:  Box::new(ignore::Error::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            ))),
        };
        let mapped = map_ignore_error(err);
        assert!(matches!(mapped, SiftError::PermissionDenied(ref p) if p == Path::new("/locked")));
        assert!(mapped.is_recoverable());
    }

    #[test]
    fn unwraps_depth_wrapper() {
        let err = ignore::Error::WithDepth {
            depth: 2,
            err:   Box::new(ignore::Error::Loop {
                ancestor: PathBuf::from("/a"),
                child:    PathBuf::from("/a/b/link"),
            }),
        };
        assert!(matches!(map_ignore_error(err), SiftError::SymlinkLoop(_)));
    }
}
