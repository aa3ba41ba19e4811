use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{JoinHandle, ThreadId};

use crossbeam_channel::{Receiver, Sender};

use crate::error::SiftError;

thread_local! {
    static CANCEL_SIGNAL: RefCell<Option<Receiver<()>>> = const { RefCell::new(None) };
}

/// Cancellation signal of the session running on the current thread.
///
/// Inside an [`Observer`](crate::Observer) callback this returns a receiver
/// that becomes ready (disconnected) as soon as the session is cancelled.
/// Observers that may block, for example on a full bounded channel, should
/// `select!` on it so a cancelling caller is never left waiting on them.
/// Returns `None` outside a session thread.
pub fn cancel_signal() -> Option<Receiver<()>> {
    CANCEL_SIGNAL.with(|s| s.borrow().clone())
}

/// Identifies one session of a [`Worker`](crate::Worker).
///
/// Ids increase with every successful `start`, so a caller receiving events
/// over a channel can drop anything older than the session it last started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub(crate) u64);

impl SessionId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// `on_complete` was delivered.
    Completed,
    /// The session was cancelled before completion was delivered.
    Cancelled,
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Delivery gate shared between a session thread and its handles.
///
/// Every callback runs while holding `lock`, and `cancel` takes the same lock
/// after clearing `live`. Once `cancel` returns, no callback is running and
/// none will start. The session thread itself may cancel from inside a
/// callback; it then skips the lock, which it already holds.
///
/// Before waiting, `cancel` drops `signal_tx` so a callback blocked on
/// [`cancel_signal`] wakes up and releases the lock.
pub(crate) struct Gate {
    live:      AtomicBool,
    completed: AtomicBool,
    lock:      Mutex<()>,
    thread:    OnceLock<ThreadId>,
    signal_tx: Mutex<Option<Sender<()>>>,
    signal_rx: Receiver<()>,
}

impl Gate {
    pub(crate) fn new() -> Self {
        let (signal_tx, signal_rx) = crossbeam_channel::bounded(0);
        Self {
            live:      AtomicBool::new(true),
            completed: AtomicBool::new(false),
            lock:      Mutex::new(()),
            thread:    OnceLock::new(),
            signal_tx: Mutex::new(Some(signal_tx)),
            signal_rx,
        }
    }

    /// Record the calling thread as the session thread and publish the
    /// cancellation signal to its observers.
    pub(crate) fn bind_current_thread(&self) {
        let _ = self.thread.set(std::thread::current().id());
        CANCEL_SIGNAL.with(|s| *s.borrow_mut() = Some(self.signal_rx.clone()));
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Run `deliver` unless the session has been cancelled.
    ///
    /// Returns `false` when the session is no longer live, in which case the
    /// traversal should stop.
    pub(crate) fn deliver(&self, deliver: impl FnOnce()) -> bool {
        // A panicking observer poisons the lock; the gate state is still valid.
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.is_live() {
            return false;
        }
        deliver();
        self.is_live()
    }

    /// Deliver the terminal callback. Marks the session completed when it ran.
    pub(crate) fn complete(&self, deliver: impl FnOnce()) -> bool {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.is_live() {
            return false;
        }
        self.completed.store(true, Ordering::Release);
        deliver();
        true
    }

    pub(crate) fn cancel(&self) {
        self.live.store(false, Ordering::Release);
        drop(self.signal_tx.lock().unwrap_or_else(|e| e.into_inner()).take());

        let on_session_thread = self.thread.get() == Some(&std::thread::current().id());
        if !on_session_thread {
            // Wait out any callback that was already in flight.
            drop(self.lock.lock().unwrap_or_else(|e| e.into_inner()));
        }
    }

    fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle to one running (or finished) session.
///
/// Cheap to clone; all clones refer to the same session. Dropping a handle
/// does not cancel the session.
#[derive(Clone)]
pub struct SessionHandle {
    id:     SessionId,
    gate:   Arc<Gate>,
    thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    pub(crate) fn new(id: SessionId, gate: Arc<Gate>, thread: JoinHandle<()>) -> Self {
        Self {
            id,
            gate,
            thread: Arc::new(Mutex::new(Some(thread))),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Stop the session.
    ///
    /// After this returns no further `on_progress` or `on_complete` call is
    /// made for this session. Cancelling a session that already completed
    /// has no effect on what was delivered.
    pub fn cancel(&self) {
        if self.gate.is_live() {
            log::trace!("session {} cancel requested", self.id);
        }
        self.gate.cancel();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        !self.gate.is_live()
    }

    /// Whether the session thread has exited.
    pub fn is_finished(&self) -> bool {
        let thread = self.thread.lock().unwrap_or_else(|e| e.into_inner());
        thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Block until the session thread exits.
    ///
    /// Only the first `join` across all clones actually waits on the thread;
    /// later calls report the outcome from the shared gate.
    ///
    /// # Errors
    ///
    /// [`SiftError::SessionPanicked`] if the session thread panicked, which
    /// only happens when an observer callback panics.
    pub fn join(&self) -> Result<SessionOutcome, SiftError> {
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(thread) = thread {
            thread.join().map_err(|_| {
                log::warn!("session {} thread panicked", self.id);
                SiftError::SessionPanicked
            })?;
        }

        Ok(if self.gate.is_completed() {
            SessionOutcome::Completed
        } else {
            SessionOutcome::Cancelled
        })
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
