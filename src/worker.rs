use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use crate::engine::{self, EngineOptions, WalkConfig};
use crate::error::SiftError;
use crate::request::SearchRequest;
use crate::session::{Gate, SessionHandle, SessionId};
use crate::traits::Observer;

/// Runs searches in the background, one session at a time.
///
/// Each [`start`](Worker::start) spawns a dedicated thread that owns the
/// traversal. Starting a new search cancels the previous one first, so an
/// older session can never deliver after a newer one began.
pub struct Worker {
    observer: Arc<dyn Observer>,
    config:   WalkConfig,
    next_id:  AtomicU64,
    current:  Mutex<Option<SessionHandle>>,
}

impl Worker {
    pub(crate) fn new(observer: Arc<dyn Observer>, config: WalkConfig) -> Self {
        Self {
            observer,
            config,
            next_id: AtomicU64::new(1),
            current: Mutex::new(None),
        }
    }

    /// Validate `request` and begin searching on a new thread.
    ///
    /// Returns as soon as the thread is spawned; progress and the final
    /// result arrive through the observer.
    ///
    /// # Errors
    ///
    /// Invalid input (empty pattern, missing or unreadable root, root that is
    /// not a directory) is reported here and no session is created; a session
    /// that was already running keeps running. [`SiftError::Spawn`] if the
    /// OS refuses to create the thread.
    pub fn start(&self, request: SearchRequest) -> Result<SessionHandle, SiftError> {
        let request = request.resolve()?;

        let previous = self.lock_current().take();
        if let Some(previous) = previous {
            if !previous.is_finished() {
                log::debug!("session {}: superseded, cancelling", previous.id());
            }
            previous.cancel();
        }

        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let gate = Arc::new(Gate::new());
        let observer = Arc::clone(&self.observer);
        let config = self.config;

        log::debug!(
            "session {id}: searching {} for {:?}",
            request.root().display(),
            request.pattern()
        );

        let thread = thread::Builder::new()
            .name(format!("filesift-session-{}", id.get()))
            .spawn({
                let gate = Arc::clone(&gate);
                move || {
                    gate.bind_current_thread();
                    engine::run(EngineOptions {
                        id,
                        request: &request,
                        config,
                        observer: observer.as_ref(),
                        gate: &gate,
                    });
                }
            })
            .map_err(SiftError::Spawn)?;

        let handle = SessionHandle::new(id, gate, thread);

        // A concurrent `start` may have stored its session in the meantime.
        let stale = self.lock_current().replace(handle.clone());
        if let Some(stale) = stale {
            stale.cancel();
        }
        Ok(handle)
    }

    /// Cancel `handle`'s session. Equivalent to [`SessionHandle::cancel`].
    pub fn cancel(&self, handle: &SessionHandle) {
        handle.cancel();

        let mut current = self.lock_current();
        if current.as_ref().map(SessionHandle::id) == Some(handle.id()) {
            *current = None;
        }
    }

    /// The most recently started session, if it has not been cancelled
    /// through this worker.
    pub fn current(&self) -> Option<SessionHandle> {
        self.lock_current().clone()
    }

    /// Whether a session is still running.
    pub fn is_busy(&self) -> bool {
        self.current().is_some_and(|h| !h.is_finished())
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<SessionHandle>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let current = self.current.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = current.take() {
            handle.cancel();
        }
    }
}
