//! A running cycle: clock, scheduler, gate and dispatcher wired together.
//!
//! ## Usage
//!
//! ```ignore
//! let config = Config::load_or_default().validate()?;
//! let session = CycleSession::new(&config, Host::headless(channel));
//! session.start()?;
//! let mut snapshots = session.snapshots();
//! // renderer reads *snapshots.borrow() on every change
//! session.handle(HostEvent::Interaction(InteractionKind::KeyDown)).await;
//! session.stop();
//! ```

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::info;

use crate::clock::{ClockSource, CycleLength, Snapshot, SystemClock};
use crate::error::Result;
use crate::events::Event;
use crate::feedback::{FeedbackChannel, FeedbackConfig, FeedbackDispatcher};
use crate::gate::{
    AudioBackend, HostEvent, NoopAudio, PermissionBroker, StaticVisibility, VisibilityGate,
    VisibilitySource, VisibilityState,
};
use crate::scheduler::{CycleCore, RedundantScheduler, SchedulerStats};
use crate::storage::ValidatedConfig;

const EVENT_BUFFER: usize = 256;

/// The host collaborators a session needs.
#[derive(Clone)]
pub struct Host {
    pub clock: Arc<dyn ClockSource>,
    pub visibility: Arc<dyn VisibilitySource>,
    pub audio: Arc<dyn AudioBackend>,
    pub permissions: Arc<dyn PermissionBroker>,
    pub feedback: Arc<dyn FeedbackChannel>,
}

impl Host {
    /// Wall clock, always visible, no audio gating.
    pub fn headless(feedback: Arc<dyn FeedbackChannel>) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            visibility: Arc::new(StaticVisibility(true)),
            audio: Arc::new(NoopAudio),
            permissions: Arc::new(NoopAudio),
            feedback,
        }
    }
}

pub struct CycleSession {
    scheduler: Arc<RedundantScheduler>,
    gate: VisibilityGate,
    events: broadcast::Sender<Event>,
}

impl CycleSession {
    /// The cycle's start instant is taken from `host.clock` here.
    pub fn new(config: &ValidatedConfig, host: Host) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let dispatcher = FeedbackDispatcher::new(config.feedback, host.feedback);
        let core = CycleCore::new(host.clock, config.cycle_length, dispatcher, events.clone());
        let scheduler = Arc::new(RedundantScheduler::new(
            Arc::new(Mutex::new(core)),
            config.scheduler.clone(),
            host.visibility.is_visible(),
        ));
        let gate = VisibilityGate::new(
            host.visibility.as_ref(),
            host.audio,
            host.permissions,
            scheduler.clone(),
            events.clone(),
        );
        Self {
            scheduler,
            gate,
            events,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot {
        self.scheduler.core().lock().snapshot()
    }

    /// Renderer-facing stream of snapshots, updated on every refresh.
    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.scheduler.core().lock().subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn visibility(&self) -> VisibilityState {
        self.gate.state()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.core().lock().stats()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn gate(&self) -> &VisibilityGate {
        &self.gate
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm the scheduler. Degraded sources are reported as events.
    pub fn start(&self) -> Result<()> {
        let degraded = self.scheduler.start()?;
        let now = Utc::now();
        for (source, reason) in degraded {
            let _ = self.events.send(Event::SourceDegraded {
                source,
                reason: reason.to_string(),
                at: now,
            });
        }

        let (cycle_length, stride) = {
            let core = self.scheduler.core().lock();
            (core.cycle_length(), core.feedback_config().stride)
        };
        info!(cycle_secs = cycle_length.as_secs(), stride = stride.get(), "session started");
        let _ = self.events.send(Event::SessionStarted {
            cycle_length_secs: cycle_length.as_secs(),
            stride_secs: stride.get(),
            live_sources: self.scheduler.live_sources(),
            at: now,
        });
        Ok(())
    }

    /// Release every wake-up source and cancel in-flight speech. Idempotent.
    pub fn stop(&self) {
        if !self.scheduler.is_running() {
            return;
        }
        self.scheduler.stop();
        let _ = self.events.send(Event::SessionStopped {
            stats: self.stats(),
            at: Utc::now(),
        });
    }

    pub async fn handle(&self, event: HostEvent) {
        self.gate.handle(event).await;
    }

    pub async fn request_permissions(&self) -> bool {
        self.gate.request_permissions().await
    }

    pub async fn resume_feedback_channel(&self) -> bool {
        self.gate.resume_feedback_channel().await
    }

    pub fn set_cycle_length(&self, cycle_length: CycleLength) {
        self.scheduler.core().lock().set_cycle_length(cycle_length);
    }

    pub fn set_feedback_config(&self, config: FeedbackConfig) {
        self.scheduler.core().lock().set_feedback_config(config);
    }
}

impl Drop for CycleSession {
    fn drop(&mut self) {
        self.stop();
    }
}
