use std::sync::Arc;

use crate::engine::WalkConfig;
use crate::error::SiftError;
use crate::results::SearchResult;
use crate::session::SessionId;
use crate::traits::{CallbackObserver, Observer};
use crate::worker::Worker;

// ---------------------------------------------------------------------------
// WorkerBuilder
// ---------------------------------------------------------------------------

/// Entry point for configuring a [`Worker`].
///
/// Created via [`filesift::worker()`](crate::worker). Register an observer
/// (or the two closures), set options, then call [`build()`](WorkerBuilder::build).
///
/// # Example
///
/// ```rust,ignore
/// let (tx, rx) = crossbeam_channel::unbounded::<SearchEvent>();
/// let worker = filesift::worker()
///     .observer(tx)
///     .sort_by_name(true)
///     .build()?;
/// ```
#[derive(Default)]
pub struct WorkerBuilder {
    observer:  Option<Arc<dyn Observer>>,
    callbacks: CallbackObserver,
    config:    WalkConfig,
}

impl WorkerBuilder {
    // ── Observation ───────────────────────────────────────────────────────

    /// Set the observer that receives progress and completion.
    ///
    /// Any type implementing [`Observer`] is accepted, including
    /// `crossbeam_channel::Sender<SearchEvent>`. Replaces any closures
    /// registered with `.on_progress()` / `.on_complete()`.
    pub fn observer(mut self, o: impl Observer + 'static) -> Self {
        self.observer = Some(Arc::new(o));
        self
    }

    /// Register a progress callback. Runs on the session thread.
    pub fn on_progress(mut self, f: impl Fn(SessionId, u8) + Send + Sync + 'static) -> Self {
        self.callbacks.progress = Some(Box::new(f));
        self
    }

    /// Register a completion callback. Runs on the session thread.
    pub fn on_complete(
        mut self,
        f: impl Fn(SessionId, SearchResult) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks.complete = Some(Box::new(f));
        self
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Follow symbolic links while traversing. Off by default; loops are
    /// detected and skipped.
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.config.follow_links = yes;
        self
    }

    /// Visit directory entries in file-name order.
    ///
    /// Off by default, in which case results follow the order the filesystem
    /// lists entries in.
    pub fn sort_by_name(mut self, yes: bool) -> Self {
        self.config.sort_by_name = yes;
        self
    }

    /// Only report progress when the percentage changes.
    ///
    /// Off by default: every visited file produces a progress call, as a
    /// progress bar bound directly to the callback expects.
    pub fn coalesce_progress(mut self, yes: bool) -> Self {
        self.config.coalesce_progress = yes;
        self
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// Create the worker. No session is started until
    /// [`Worker::start`] is called.
    ///
    /// # Errors
    ///
    /// [`SiftError::NoObserver`] when neither an observer nor a callback was
    /// registered.
    pub fn build(self) -> Result<Worker, SiftError> {
        let has_callbacks = self.callbacks.progress.is_some() || self.callbacks.complete.is_some();

        let observer: Arc<dyn Observer> = match self.observer {
            Some(o) => o,
            None if has_callbacks => Arc::new(self.callbacks),
            None => return Err(SiftError::NoObserver),
        };

        Ok(Worker::new(observer, self.config))
    }
}
