use crossbeam_channel::{select, Sender};

use crate::results::SearchResult;
use crate::session::{cancel_signal, SessionId};

/// Receives the two observations a session makes: progress and completion.
///
/// Implement this to wire the worker into a UI event loop, a logger, or any
/// other consumer. Callbacks run on the session thread, never on the thread
/// that called [`Worker::start`](crate::Worker::start), so implementations
/// should hand the data off quickly.
///
/// # Thread Safety
///
/// `Send + Sync` are required: one observer is shared by every session a
/// worker runs.
///
/// # Guarantees
///
/// Per session, `on_progress` values never decrease, `on_complete` is called
/// at most once and is always the last call, and nothing is called after the
/// session is cancelled.
///
/// # Example
///
/// ```rust
/// use filesift::{Observer, SearchResult, SessionId};
///
/// struct Printer;
///
/// impl Observer for Printer {
///     fn on_progress(&self, _session: SessionId, percent: u8) {
///         eprint!("\r{percent:3}%");
///     }
///
///     fn on_complete(&self, _session: SessionId, result: SearchResult) {
///         for path in &result {
///             println!("{}", path.display());
///         }
///     }
/// }
/// ```
pub trait Observer: Send + Sync {
    /// Percentage of counted files visited so far, in `0..=100`.
    fn on_progress(&self, session: SessionId, percent: u8);

    /// The final result list for the session.
    fn on_complete(&self, session: SessionId, result: SearchResult);
}

/// Channel form of the [`Observer`] callbacks.
#[derive(Debug, Clone)]
pub enum SearchEvent {
    Progress {
        session: SessionId,
        percent: u8,
    },
    Complete {
        session: SessionId,
        result:  SearchResult,
    },
}

impl SearchEvent {
    /// The session that produced this event.
    pub fn session(&self) -> SessionId {
        match self {
            Self::Progress { session, .. } | Self::Complete { session, .. } => *session,
        }
    }
}

/// Forward every observation into a channel the caller receives on.
///
/// Bounded channels are fine: a send blocked on a full channel gives up as
/// soon as the session is cancelled, so the receiving thread can cancel or
/// restart without draining first. A disconnected receiver is not an error;
/// the session simply runs to the end with nobody listening.
impl Observer for Sender<SearchEvent> {
    fn on_progress(&self, session: SessionId, percent: u8) {
        if !send_unless_cancelled(self, SearchEvent::Progress { session, percent }) {
            log::trace!("session {session}: progress not delivered");
        }
    }

    fn on_complete(&self, session: SessionId, result: SearchResult) {
        if !send_unless_cancelled(self, SearchEvent::Complete { session, result }) {
            log::debug!("session {session}: completion not delivered");
        }
    }
}

fn send_unless_cancelled(tx: &Sender<SearchEvent>, event: SearchEvent) -> bool {
    match cancel_signal() {
        Some(cancel) => select! {
            send(tx, event) -> res => res.is_ok(),
            recv(cancel) -> _ => false,
        },
        None => tx.send(event).is_ok(),
    }
}

type ProgressFn = Box<dyn Fn(SessionId, u8) + Send + Sync>;
type CompleteFn = Box<dyn Fn(SessionId, SearchResult) + Send + Sync>;

/// Observer assembled from the builder's `on_progress` / `on_complete`
/// closures. Either side may be missing.
#[derive(Default)]
pub(crate) struct CallbackObserver {
    pub progress: Option<ProgressFn>,
    pub complete: Option<CompleteFn>,
}

impl Observer for CallbackObserver {
    fn on_progress(&self, session: SessionId, percent: u8) {
        if let Some(f) = &self.progress {
            f(session, percent);
        }
    }

    fn on_complete(&self, session: SessionId, result: SearchResult) {
        if let Some(f) = &self.complete {
            f(session, result);
        }
    }
}
