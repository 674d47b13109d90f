//! Observer trait for poll events.
//!
//! Inject an [`Arc<dyn PollObserver>`] into [`crate::poll::Poller`] (or
//! [`crate::session::InsightsSession::submit`]) to hear about each tick, each
//! slot as it arrives, and each per-resource failure.
//!
//! The library never renders anything itself: the CLI drives a spinner from
//! these callbacks, tests count them, and an embedding application could
//! forward them to a channel or a websocket. The trait is `Send + Sync`
//! because the poller runs inside `tokio::spawn`.
//!
//! # Example
//!
//! ```rust
//! use pdf_insights::{PollObserver, Slot};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     ready: AtomicUsize,
//! }
//!
//! impl PollObserver for CountingObserver {
//!     fn on_slot_ready(&self, slot: Slot) {
//!         let n = self.ready.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{slot} ready ({n} so far)");
//!     }
//! }
//!
//! let observer: Arc<dyn PollObserver> = Arc::new(CountingObserver {
//!     ready: AtomicUsize::new(0),
//! });
//! observer.on_slot_ready(Slot::Comparisons);
//! ```

use crate::error::SlotError;
use crate::model::Slot;
use crate::poll::PollOutcome;
use std::sync::Arc;

/// Called by the poller as it runs.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls are made sequentially from the poll task.
pub trait PollObserver: Send + Sync {
    /// Called once when the poll task starts, before the first tick.
    ///
    /// # Arguments
    /// * `max_ticks` — the tick cap for this run
    fn on_poll_start(&self, max_ticks: u32) {
        let _ = max_ticks;
    }

    /// Called at the start of each tick, before the four fetches go out.
    ///
    /// # Arguments
    /// * `tick`      — 1-indexed tick number
    /// * `max_ticks` — the tick cap for this run
    fn on_tick(&self, tick: u32, max_ticks: u32) {
        let _ = (tick, max_ticks);
    }

    /// Called when a slot receives a new non-empty payload.
    fn on_slot_ready(&self, slot: Slot) {
        let _ = slot;
    }

    /// Called when fetching a slot failed on this tick.
    ///
    /// The other slots and the poll itself are unaffected.
    fn on_slot_error(&self, slot: Slot, error: &SlotError) {
        let _ = (slot, error);
    }

    /// Called exactly once with the terminal outcome.
    fn on_poll_finished(&self, outcome: &PollOutcome) {
        let _ = outcome;
    }
}

/// A no-op observer, used when the caller doesn't need events.
pub struct NoopObserver;

impl PollObserver for NoopObserver {}

/// Convenience alias for the shared observer handle.
pub type Observer = Arc<dyn PollObserver>;
