//! # filesift
//!
//! Background filename search with progress reporting and cancellation.
//!
//! A [`Worker`] runs each search on its own thread. The traversal counts the
//! regular files under the root, then walks the tree again and collects every
//! file whose name contains the pattern (case-sensitive). The caller observes
//! the session through an [`Observer`]: progress as a percentage after every
//! file, then the whole result list exactly once.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use filesift::{SearchEvent, SearchRequest};
//!
//! let (tx, rx) = crossbeam_channel::unbounded::<SearchEvent>();
//! let worker = filesift::worker().observer(tx).build().unwrap();
//!
//! let session = worker.start(SearchRequest::new("invoice", "/home/me/docs")).unwrap();
//!
//! for event in rx.iter() {
//!     match event {
//!         SearchEvent::Progress { percent, .. } => eprint!("\r{percent:3}%"),
//!         SearchEvent::Complete { result, .. } => {
//!             for path in &result {
//!                 println!("{}", path.display());
//!             }
//!             break;
//!         }
//!     }
//! }
//! # drop(session);
//! ```
//!
//! # Callbacks
//!
//! Closures can be registered instead of an observer:
//!
//! ```rust,no_run
//! use filesift::SearchRequest;
//!
//! let worker = filesift::worker()
//!     .on_progress(|_, percent| eprint!("\r{percent:3}%"))
//!     .on_complete(|_, result| println!("{} files found", result.len()))
//!     .build()
//!     .unwrap();
//!
//! let session = worker.start(SearchRequest::new(".rs", ".")).unwrap();
//! session.join().unwrap();
//! ```
//!
//! # Sessions
//!
//! Starting a search while another is running cancels the older one; after
//! [`SessionHandle::cancel`] returns, that session delivers nothing more.
//! Events carry a [`SessionId`] so a channel consumer can drop events that
//! were queued before the cancellation.

#![forbid(unsafe_code)]

mod builder;
mod engine;
mod error;
mod request;
mod results;
mod session;
mod traits;
mod worker;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::WorkerBuilder;
pub use error::SiftError;
pub use request::SearchRequest;
pub use results::{ScanStats, SearchResult};
pub use session::{cancel_signal, SessionHandle, SessionId, SessionOutcome};
pub use traits::{Observer, SearchEvent};
pub use worker::Worker;

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`WorkerBuilder`] to configure a search worker.
///
/// # Example
///
/// ```rust
/// use filesift::{SearchEvent, SearchRequest};
///
/// let dir = std::env::temp_dir();
/// let (tx, rx) = crossbeam_channel::unbounded::<SearchEvent>();
/// let worker = filesift::worker().observer(tx).build().unwrap();
///
/// // An empty pattern is rejected before any thread starts.
/// assert!(worker.start(SearchRequest::new("", &dir)).is_err());
/// assert!(rx.try_recv().is_err());
/// ```
pub fn worker() -> WorkerBuilder {
    WorkerBuilder::default()
}
