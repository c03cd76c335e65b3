//! The single consumer slot every wake-up source refreshes.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tracing::trace;

use super::source::{SchedulerStats, WakeSource};
use crate::clock::{compute_snapshot, ClockSource, CycleLength, Snapshot};
use crate::events::Event;
use crate::feedback::{FeedbackConfig, FeedbackDispatcher};

/// Clock state, the latest "now", and the dispatcher fed from it.
///
/// A refresh reads the clock, recomputes the snapshot, runs the dispatcher
/// and publishes, all in one call. Callers hold the lock for exactly that
/// long, which is what keeps refresh-then-dispatch atomic.
pub struct CycleCore {
    clock: Arc<dyn ClockSource>,
    start_ms: u64,
    now_ms: u64,
    cycle_length: CycleLength,
    dispatcher: FeedbackDispatcher,
    active: bool,
    stats: SchedulerStats,
    snapshot_tx: watch::Sender<Snapshot>,
    events: broadcast::Sender<Event>,
}

impl CycleCore {
    /// The start instant is read from `clock` here and never changes after.
    pub fn new(
        clock: Arc<dyn ClockSource>,
        cycle_length: CycleLength,
        dispatcher: FeedbackDispatcher,
        events: broadcast::Sender<Event>,
    ) -> Self {
        let start_ms = clock.now_ms();
        let (snapshot_tx, _) = watch::channel(Snapshot::initial(cycle_length));
        Self {
            clock,
            start_ms,
            now_ms: start_ms,
            cycle_length,
            dispatcher,
            active: false,
            stats: SchedulerStats::default(),
            snapshot_tx,
            events,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn cycle_length(&self) -> CycleLength {
        self.cycle_length
    }

    pub fn feedback_config(&self) -> FeedbackConfig {
        self.dispatcher.config()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        *self.snapshot_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Refreshes after `deactivate` are ignored until `activate` again, so a
    /// source that fires during teardown cannot touch the dispatcher.
    pub fn activate(&mut self) {
        self.active = true;
        self.dispatcher.reset();
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.dispatcher.cancel();
    }

    /// `now = clock.now()`, then recompute, dispatch and publish.
    ///
    /// Last write wins; redundant refreshes from different sources within the
    /// same second are harmless because the dispatcher is edge-triggered.
    pub fn refresh(&mut self, source: WakeSource) -> Option<Snapshot> {
        if !self.active {
            return None;
        }
        self.now_ms = self.clock.now_ms();
        self.stats.record(source);

        let snapshot = compute_snapshot(self.start_ms, self.now_ms, self.cycle_length);
        if let Some(feedback) = self.dispatcher.observe(snapshot.remaining_secs) {
            let _ = self.events.send(Event::FeedbackFired {
                feedback,
                cycle_index: snapshot.cycle_index,
                at: Utc::now(),
            });
        }
        trace!(source = source.name(), remaining = snapshot.remaining_secs, "refresh");
        self.snapshot_tx.send_replace(snapshot);
        Some(snapshot)
    }

    /// Reinterpret the same elapsed time against a new length.
    ///
    /// The edge detector is re-primed so the jump in remaining time is not
    /// announced as a boundary crossing.
    pub fn set_cycle_length(&mut self, cycle_length: CycleLength) {
        self.cycle_length = cycle_length;
        self.dispatcher.reset();
        let _ = self.events.send(Event::CycleLengthChanged {
            cycle_length_secs: cycle_length.as_secs(),
            at: Utc::now(),
        });
        self.refresh(WakeSource::Forced);
    }

    pub fn set_feedback_config(&mut self, config: FeedbackConfig) {
        self.dispatcher.set_config(config);
    }
}

impl std::fmt::Debug for CycleCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleCore")
            .field("start_ms", &self.start_ms)
            .field("now_ms", &self.now_ms)
            .field("cycle_length", &self.cycle_length)
            .field("active", &self.active)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
