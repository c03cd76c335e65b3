use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::core::CycleCore;
use super::heartbeat::HeartbeatThread;
use super::source::{SchedulerOptions, WakeSource};
use crate::error::SchedulerError;

/// What the visibility gate needs from the scheduler.
pub trait RefreshTrigger: Send + Sync {
    /// Refresh "now" immediately, on the caller's stack.
    fn force_refresh(&self);

    /// Mirror host visibility into the frame source. Regaining visibility
    /// also forces a refresh.
    fn set_foreground(&self, visible: bool);
}

/// The live wake-up sources of one Running period.
#[derive(Debug)]
struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(WakeSource, JoinHandle<()>)>,
    heartbeat: Option<HeartbeatThread>,
}

impl SchedulerHandle {
    fn live_sources(&self) -> Vec<WakeSource> {
        self.tasks.iter().map(|(source, _)| *source).collect()
    }

    fn release(mut self) {
        let _ = self.shutdown_tx.send(true);
        for (source, handle) in self.tasks.drain(..) {
            handle.abort();
            debug!(source = source.name(), "wake-up source released");
        }
        if let Some(mut heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
    }
}

/// Drives a shared [`CycleCore`] from several independent wake-up sources.
pub struct RedundantScheduler {
    core: Arc<Mutex<CycleCore>>,
    options: SchedulerOptions,
    visible_tx: watch::Sender<bool>,
    handle: Mutex<Option<SchedulerHandle>>,
}

impl RedundantScheduler {
    pub fn new(core: Arc<Mutex<CycleCore>>, options: SchedulerOptions, visible: bool) -> Self {
        let (visible_tx, _) = watch::channel(visible);
        Self {
            core,
            options,
            visible_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn core(&self) -> &Arc<Mutex<CycleCore>> {
        &self.core
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    pub fn is_foreground(&self) -> bool {
        *self.visible_tx.borrow()
    }

    /// Sources armed by the current Running period (empty when stopped).
    pub fn live_sources(&self) -> Vec<WakeSource> {
        self.handle
            .lock()
            .as_ref()
            .map(SchedulerHandle::live_sources)
            .unwrap_or_default()
    }

    /// Arm every wake-up source and take one immediate refresh.
    ///
    /// Sources that cannot be armed are skipped with a warning and reported
    /// in the returned list of degraded sources.
    ///
    /// # Errors
    ///
    /// Fails if already running or if called outside a tokio runtime.
    pub fn start(&self) -> Result<Vec<(WakeSource, SchedulerError)>, SchedulerError> {
        let mut slot = self.handle.lock();
        if slot.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        let (shutdown_tx, _) = watch::channel(false);
        let mut handle = SchedulerHandle {
            shutdown_tx,
            tasks: Vec::with_capacity(4),
            heartbeat: None,
        };
        let mut degraded = Vec::new();

        self.core.lock().activate();

        handle.tasks.push((
            WakeSource::Periodic,
            runtime.spawn(periodic(self.core.clone(), handle.shutdown_tx.subscribe(), self.options.clone())),
        ));
        handle.tasks.push((
            WakeSource::Rearming,
            runtime.spawn(rearming(self.core.clone(), handle.shutdown_tx.subscribe(), self.options.clone())),
        ));
        handle.tasks.push((
            WakeSource::Frame,
            runtime.spawn(frame(
                self.core.clone(),
                handle.shutdown_tx.subscribe(),
                self.visible_tx.subscribe(),
                self.options.clone(),
            )),
        ));

        match self.arm_heartbeat(&runtime, &handle) {
            Ok((thread, relay)) => {
                handle.heartbeat = Some(thread);
                handle.tasks.push((WakeSource::Heartbeat, relay));
            }
            Err(e) => {
                warn!(error = %e, "continuing without isolated heartbeat");
                degraded.push((WakeSource::Heartbeat, e));
            }
        }

        for (source, _) in &handle.tasks {
            debug!(source = source.name(), "wake-up source armed");
        }
        info!(sources = handle.tasks.len(), "scheduler running");

        *slot = Some(handle);
        drop(slot);

        self.force_refresh();
        Ok(degraded)
    }

    /// Release every source. Idempotent.
    pub fn stop(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        // Deactivate first so a source racing the abort sees a dead core.
        self.core.lock().deactivate();
        handle.release();
        info!("scheduler stopped");
    }

    fn arm_heartbeat(
        &self,
        runtime: &tokio::runtime::Handle,
        handle: &SchedulerHandle,
    ) -> Result<(HeartbeatThread, JoinHandle<()>), SchedulerError> {
        if !self.options.heartbeat_enabled {
            return Err(SchedulerError::SourceUnavailable {
                source_name: WakeSource::Heartbeat.name(),
                message: "disabled by configuration".into(),
            });
        }
        let (beat_tx, beat_rx) = mpsc::unbounded_channel();
        let thread = HeartbeatThread::spawn(self.options.heartbeat_interval, beat_tx).map_err(|e| {
            SchedulerError::SourceUnavailable {
                source_name: WakeSource::Heartbeat.name(),
                message: e.to_string(),
            }
        })?;
        let relay = runtime.spawn(heartbeat_relay(self.core.clone(), handle.shutdown_tx.subscribe(), beat_rx));
        Ok((thread, relay))
    }
}

impl RefreshTrigger for RedundantScheduler {
    fn force_refresh(&self) {
        self.core.lock().refresh(WakeSource::Forced);
    }

    fn set_foreground(&self, visible: bool) {
        let was_visible = self.visible_tx.send_replace(visible);
        if visible && !was_visible {
            self.force_refresh();
        }
    }
}

impl Drop for RedundantScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            self.core.lock().deactivate();
            handle.release();
        }
    }
}

impl std::fmt::Debug for RedundantScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedundantScheduler")
            .field("options", &self.options)
            .field("foreground", &self.is_foreground())
            .field("live_sources", &self.live_sources())
            .finish()
    }
}

// ── Sources ──────────────────────────────────────────────────────────

async fn periodic(core: Arc<Mutex<CycleCore>>, mut shutdown: watch::Receiver<bool>, options: SchedulerOptions) {
    let mut ticker = tokio::time::interval(options.periodic_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                core.lock().refresh(WakeSource::Periodic);
            }
        }
    }
}

async fn rearming(core: Arc<Mutex<CycleCore>>, mut shutdown: watch::Receiver<bool>, options: SchedulerOptions) {
    loop {
        // A fresh one-shot each round; nothing carries over between rounds.
        let delay = tokio::time::sleep(options.rearm_delay);
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = delay => {
                core.lock().refresh(WakeSource::Rearming);
            }
        }
    }
}

async fn frame(
    core: Arc<Mutex<CycleCore>>,
    mut shutdown: watch::Receiver<bool>,
    mut visible: watch::Receiver<bool>,
    options: SchedulerOptions,
) {
    let mut ticker = tokio::time::interval(options.frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        // Park while hidden; redraw cadence is meaningless off-screen.
        if !*visible.borrow_and_update() {
            tokio::select! {
                _ = shutdown.changed() => break,
                changed = visible.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }
        tokio::select! {
            _ = shutdown.changed() => break,
            changed = visible.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                core.lock().refresh(WakeSource::Frame);
            }
        }
    }
}

async fn heartbeat_relay(
    core: Arc<Mutex<CycleCore>>,
    mut shutdown: watch::Receiver<bool>,
    mut beats: mpsc::UnboundedReceiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            beat = beats.recv() => match beat {
                Some(()) => {
                    core.lock().refresh(WakeSource::Heartbeat);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{CycleLength, SystemClock};
    use crate::feedback::{FeedbackConfig, FeedbackDispatcher, SilentChannel};
    use std::time::Duration;
    use tokio::sync::broadcast;

    fn scheduler(options: SchedulerOptions, visible: bool) -> RedundantScheduler {
        let (events, _) = broadcast::channel(16);
        let dispatcher = FeedbackDispatcher::new(FeedbackConfig::default(), Arc::new(SilentChannel));
        let core = CycleCore::new(
            Arc::new(SystemClock),
            CycleLength::new(30.0).unwrap(),
            dispatcher,
            events,
        );
        RedundantScheduler::new(Arc::new(Mutex::new(core)), options, visible)
    }

    fn fast() -> SchedulerOptions {
        SchedulerOptions {
            periodic_interval: Duration::from_millis(5),
            rearm_delay: Duration::from_millis(5),
            frame_interval: Duration::from_millis(5),
            heartbeat_interval: Duration::from_millis(5),
            heartbeat_enabled: true,
        }
    }

    #[test]
    fn start_outside_runtime_is_rejected() {
        let s = scheduler(fast(), true);
        assert!(matches!(s.start(), Err(SchedulerError::NoRuntime)));
        assert!(!s.is_running());
    }

    #[tokio::test]
    async fn every_source_refreshes_while_running() {
        let s = scheduler(fast(), true);
        let degraded = s.start().unwrap();
        assert!(degraded.is_empty());
        assert_eq!(
            s.live_sources(),
            vec![WakeSource::Periodic, WakeSource::Rearming, WakeSource::Frame, WakeSource::Heartbeat]
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        let stats = s.core().lock().stats();
        for source in [
            WakeSource::Periodic,
            WakeSource::Rearming,
            WakeSource::Frame,
            WakeSource::Heartbeat,
            WakeSource::Forced,
        ] {
            assert!(stats.count(source) > 0, "{} never fired", source.name());
        }
        s.stop();
    }

    #[tokio::test]
    async fn nothing_refreshes_after_stop() {
        let s = scheduler(fast(), true);
        s.start().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        s.stop();
        assert!(!s.is_running());
        assert!(s.live_sources().is_empty());

        let after_stop = s.core().lock().stats();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(s.core().lock().stats(), after_stop);
    }

    #[tokio::test]
    async fn disabled_heartbeat_degrades_without_failing() {
        let options = SchedulerOptions {
            heartbeat_enabled: false,
            ..fast()
        };
        let s = scheduler(options, true);
        let degraded = s.start().unwrap();
        assert_eq!(degraded.len(), 1);
        assert_eq!(degraded[0].0, WakeSource::Heartbeat);
        assert!(!s.live_sources().contains(&WakeSource::Heartbeat));
        assert!(s.is_running());
        s.stop();
    }

    #[tokio::test]
    async fn frame_source_idles_while_hidden() {
        let s = scheduler(fast(), false);
        s.start().unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(s.core().lock().stats().count(WakeSource::Frame), 0);

        s.set_foreground(true);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(s.core().lock().stats().count(WakeSource::Frame) > 0);
        s.stop();
    }

    #[tokio::test]
    async fn regaining_foreground_forces_refresh() {
        let s = scheduler(SchedulerOptions::default(), false);
        s.start().unwrap();
        let forced = s.core().lock().stats().count(WakeSource::Forced);

        s.set_foreground(false);
        assert_eq!(s.core().lock().stats().count(WakeSource::Forced), forced);
        s.set_foreground(true);
        assert_eq!(s.core().lock().stats().count(WakeSource::Forced), forced + 1);
        s.stop();
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let s = scheduler(fast(), true);
        s.start().unwrap();
        assert!(matches!(s.start(), Err(SchedulerError::AlreadyRunning)));
        s.stop();
        s.stop();
    }
}
