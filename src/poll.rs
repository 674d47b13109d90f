//! The polling task: fetch the four result resources until all arrive.
//!
//! ```text
//! start ──▶ wait interval ──▶ tick: 4 fetches (concurrent) ──▶ merge
//!                 ▲                                              │
//!                 └──── not complete, ticks < max ◀──────────────┤
//!                                                                ├─▶ Completed
//!                                                                ├─▶ Exhausted (tick cap)
//!                         stop() / handle dropped ───────────────┴─▶ Aborted
//! ```
//!
//! One [`Poller`] becomes one spawned task owned by a [`PollHandle`]. The
//! handle is the only way to reach the timer: [`PollHandle::stop`] ends it
//! at the next await point, and dropping the handle aborts the task outright,
//! so a poll can never outlive whatever started it.
//!
//! A tick never overlaps the previous one. All four fetches of a tick are
//! awaited before the next interval starts counting, and missed ticks are
//! delayed rather than bunched up.

use crate::backend::ResultSource;
use crate::error::{InsightsError, SlotError};
use crate::model::Slot;
use crate::progress::{NoopObserver, Observer, PollObserver};
use crate::state::PollState;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

/// Timing and bounds of a poll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Delay before the first tick and between ticks.
    pub interval: Duration,
    /// Number of ticks after which polling stops unconditionally.
    pub max_ticks: u32,
    /// Most recent table visualisations kept in state.
    pub table_visuals_limit: usize,
}

impl PollSettings {
    /// Settings with the default table-visuals limit of 10.
    pub fn new(interval: Duration, max_ticks: u32) -> Result<Self, InsightsError> {
        let settings = Self {
            interval,
            max_ticks,
            table_visuals_limit: 10,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), InsightsError> {
        if self.interval.is_zero() {
            return Err(InsightsError::InvalidConfig(
                "poll interval must be greater than zero".into(),
            ));
        }
        if self.max_ticks == 0 {
            return Err(InsightsError::InvalidConfig("max_ticks must be ≥ 1".into()));
        }
        Ok(())
    }
}

/// How a poll run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// All four slots hold a result.
    Completed { ticks: u32 },
    /// The tick cap was reached first; `missing` lists the empty slots.
    Exhausted { ticks: u32, missing: Vec<Slot> },
    /// Stopped by the caller before finishing.
    Aborted { ticks: u32 },
}

impl PollOutcome {
    pub fn ticks(&self) -> u32 {
        match self {
            PollOutcome::Completed { ticks }
            | PollOutcome::Exhausted { ticks, .. }
            | PollOutcome::Aborted { ticks } => *ticks,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, PollOutcome::Completed { .. })
    }

    /// Status line shown to the user.
    pub fn message(&self) -> &'static str {
        match self {
            PollOutcome::Completed { .. } => "Processing complete!",
            PollOutcome::Exhausted { .. } => {
                "Could not fetch all results. Please try again later."
            }
            PollOutcome::Aborted { .. } => "Polling stopped.",
        }
    }
}

/// Terminal outcome plus the results gathered along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollReport {
    pub outcome: PollOutcome,
    pub state: PollState,
}

/// A configured, not yet started poll.
pub struct Poller {
    source: Arc<dyn ResultSource>,
    settings: PollSettings,
    observer: Observer,
}

impl Poller {
    pub fn new(source: Arc<dyn ResultSource>, settings: PollSettings) -> Result<Self, InsightsError> {
        settings.validate()?;
        Ok(Self {
            source,
            settings,
            observer: Arc::new(NoopObserver),
        })
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = observer;
        self
    }

    /// Spawn the poll task and return its handle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> PollHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(PollState::new());
        let ticks = Arc::new(AtomicU32::new(0));

        let task = tokio::spawn(run(
            self.source,
            self.settings,
            self.observer,
            state_tx,
            cancel_rx,
            Arc::clone(&ticks),
        ));

        PollHandle {
            cancel: Arc::new(cancel_tx),
            state: state_rx,
            ticks,
            task: Some(task),
        }
    }
}

/// Cloneable stop switch for a poll, usable from another task
/// (e.g. a Ctrl-C handler) while the owner awaits [`PollHandle::join`].
#[derive(Clone)]
pub struct PollStopper(Arc<watch::Sender<bool>>);

impl PollStopper {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

/// Owner of a running poll task.
///
/// Dropping the handle aborts the task.
pub struct PollHandle {
    cancel: Arc<watch::Sender<bool>>,
    state: watch::Receiver<PollState>,
    ticks: Arc<AtomicU32>,
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    /// Ask the task to stop. It finishes with [`PollOutcome::Aborted`].
    pub fn stop(&self) {
        self.cancel.send_replace(true);
    }

    pub fn stopper(&self) -> PollStopper {
        PollStopper(Arc::clone(&self.cancel))
    }

    /// Snapshot of the latest merged results.
    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Stream of snapshots: the current one first, then one per change.
    pub fn updates(&self) -> WatchStream<PollState> {
        WatchStream::new(self.state.clone())
    }

    /// Ticks fired so far.
    pub fn ticks(&self) -> u32 {
        self.ticks.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the task to finish and collect its report.
    pub async fn join(mut self) -> PollReport {
        let outcome = match self.task.take() {
            Some(task) => match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Poll task ended abnormally: {}", e);
                    PollOutcome::Aborted {
                        ticks: self.ticks(),
                    }
                }
            },
            None => PollOutcome::Aborted {
                ticks: self.ticks(),
            },
        };
        PollReport {
            outcome,
            state: self.state(),
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("Poll handle dropped; aborting poll task");
            }
            task.abort();
        }
    }
}

async fn run(
    source: Arc<dyn ResultSource>,
    settings: PollSettings,
    observer: Observer,
    state_tx: watch::Sender<PollState>,
    mut cancel_rx: watch::Receiver<bool>,
    tick_counter: Arc<AtomicU32>,
) -> PollOutcome {
    let outcome = poll_loop(
        source.as_ref(),
        &settings,
        observer.as_ref(),
        &state_tx,
        &mut cancel_rx,
        &tick_counter,
    )
    .await;
    info!("Polling finished after {} tick(s): {:?}", outcome.ticks(), outcome);
    observer.on_poll_finished(&outcome);
    outcome
}

async fn poll_loop(
    source: &dyn ResultSource,
    settings: &PollSettings,
    observer: &dyn PollObserver,
    state_tx: &watch::Sender<PollState>,
    cancel_rx: &mut watch::Receiver<bool>,
    tick_counter: &AtomicU32,
) -> PollOutcome {
    info!(
        "Polling every {:?}, at most {} tick(s)",
        settings.interval, settings.max_ticks
    );
    observer.on_poll_start(settings.max_ticks);

    let mut ticker = interval_at(Instant::now() + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut state = PollState::new();
    let mut tick = 0u32;

    loop {
        let cancelled = *cancel_rx.borrow();
        if cancelled {
            return PollOutcome::Aborted { ticks: tick };
        }
        tokio::select! {
            biased;
            _ = cancel_rx.changed() => return PollOutcome::Aborted { ticks: tick },
            _ = ticker.tick() => {}
        }

        tick += 1;
        tick_counter.store(tick, Ordering::SeqCst);
        debug!("Poll tick {}/{}", tick, settings.max_ticks);
        observer.on_tick(tick, settings.max_ticks);

        let fetches = futures::future::join4(
            source.fetch_summaries(),
            source.fetch_comparisons(),
            source.fetch_top_questions(),
            source.fetch_table_visuals(),
        );
        let (summaries, comparisons, questions, visuals) = tokio::select! {
            biased;
            _ = cancel_rx.changed() => return PollOutcome::Aborted { ticks: tick },
            results = fetches => results,
        };

        let mut changed = false;
        changed |= apply(Slot::Summaries, summaries, observer, |p| {
            state.merge_summaries(p)
        });
        changed |= apply(Slot::Comparisons, comparisons, observer, |p| {
            state.merge_comparisons(p)
        });
        changed |= apply(Slot::TopQuestions, questions, observer, |p| {
            state.merge_top_questions(p)
        });
        changed |= apply(Slot::TableVisuals, visuals, observer, |p| {
            state.merge_table_visuals(p, settings.table_visuals_limit)
        });

        if changed {
            state_tx.send_replace(state.clone());
        }

        if state.is_complete() {
            return PollOutcome::Completed { ticks: tick };
        }
        if tick >= settings.max_ticks {
            let missing = state.missing();
            warn!("Tick cap reached; still missing: {:?}", missing);
            return PollOutcome::Exhausted {
                ticks: tick,
                missing,
            };
        }
    }
}

/// Merge one fetch result; a failure is reported and leaves state untouched.
fn apply<T>(
    slot: Slot,
    result: Result<T, InsightsError>,
    observer: &dyn PollObserver,
    merge: impl FnOnce(T) -> bool,
) -> bool {
    match result {
        Ok(payload) => {
            let changed = merge(payload);
            if changed {
                debug!("{} updated", slot);
                observer.on_slot_ready(slot);
            }
            changed
        }
        Err(e) => {
            warn!("Fetching {} failed: {}", slot, e);
            observer.on_slot_error(slot, &SlotError::from(e));
            false
        }
    }
}
