use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::capability::{CapabilityState, PermissionGrants};
use super::host::{AudioBackend, HostEvent, InteractionKind, Permission, PermissionBroker, VisibilitySource};
use crate::events::Event;
use crate::scheduler::RefreshTrigger;

/// Live snapshot of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityState {
    pub is_foreground_visible: bool,
    /// Moves false -> true once per session, never back.
    pub has_qualifying_interaction: bool,
    pub feedback_channel_ready: bool,
}

#[derive(Debug)]
struct GateInner {
    visible: bool,
    interacted: bool,
    capability: CapabilityState,
    grants: PermissionGrants,
}

pub struct VisibilityGate {
    audio: Arc<dyn AudioBackend>,
    permissions: Arc<dyn PermissionBroker>,
    trigger: Arc<dyn RefreshTrigger>,
    events: broadcast::Sender<Event>,
    // Never held across an await.
    inner: Mutex<GateInner>,
}

impl VisibilityGate {
    pub fn new(
        visibility: &dyn VisibilitySource,
        audio: Arc<dyn AudioBackend>,
        permissions: Arc<dyn PermissionBroker>,
        trigger: Arc<dyn RefreshTrigger>,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            audio,
            permissions,
            trigger,
            events,
            inner: Mutex::new(GateInner {
                visible: visibility.is_visible(),
                interacted: false,
                capability: CapabilityState::Locked,
                grants: PermissionGrants::default(),
            }),
        }
    }

    pub fn state(&self) -> VisibilityState {
        let inner = self.inner.lock();
        VisibilityState {
            is_foreground_visible: inner.visible,
            has_qualifying_interaction: inner.interacted,
            feedback_channel_ready: inner.capability.is_ready(),
        }
    }

    pub fn capability(&self) -> CapabilityState {
        self.inner.lock().capability
    }

    pub fn grants(&self) -> PermissionGrants {
        self.inner.lock().grants
    }

    pub async fn handle(&self, event: HostEvent) {
        match event {
            HostEvent::VisibilityChanged(visible) => self.on_visibility_change(visible).await,
            HostEvent::Interaction(kind) => {
                self.on_interaction(kind).await;
            }
        }
    }

    /// Mirror host visibility. Regaining it forces a clock refresh and, once
    /// the audio context exists, attempts to resume it.
    pub async fn on_visibility_change(&self, visible: bool) {
        let (changed, resume) = {
            let mut inner = self.inner.lock();
            let changed = inner.visible != visible;
            inner.visible = visible;
            (changed, visible && inner.interacted)
        };
        if !changed {
            return;
        }
        info!(visible, "host visibility changed");
        self.trigger.set_foreground(visible);
        let _ = self.events.send(Event::VisibilityChanged { visible, at: Utc::now() });
        if resume {
            self.resume_feedback_channel().await;
        }
    }

    /// Returns true only for the first qualifying interaction of the session.
    pub async fn on_interaction(&self, kind: InteractionKind) -> bool {
        if !kind.is_qualifying() {
            return false;
        }
        {
            let mut inner = self.inner.lock();
            if inner.interacted {
                return false;
            }
            inner.interacted = true;
        }
        debug!(?kind, "first qualifying interaction");
        self.trigger.force_refresh();
        self.request_permissions().await;
        true
    }

    /// Acquire the audio context and the ancillary permissions.
    ///
    /// Always resolves. Each failure is logged and only lowers readiness.
    pub async fn request_permissions(&self) -> bool {
        self.transition(CapabilityState::Probing);

        let audio = match self.audio.acquire().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "audio context unavailable");
                false
            }
        };
        let notifications = self.request_one(Permission::Notifications).await;
        let wake_lock = self.request_one(Permission::WakeLock).await;

        let grants = PermissionGrants {
            audio,
            notifications,
            wake_lock,
        };
        self.inner.lock().grants = grants;
        let state = grants.settle();
        self.transition(state);
        state.is_ready()
    }

    /// Resume an auto-suspended audio context. Idempotent.
    ///
    /// Does nothing before the first permission request has settled: there
    /// is no context to resume yet, and a probe in flight owns the grants.
    pub async fn resume_feedback_channel(&self) -> bool {
        if matches!(self.capability(), CapabilityState::Locked | CapabilityState::Probing) {
            return false;
        }
        let audio = if self.audio.is_running() {
            true
        } else {
            match self.audio.resume().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "audio context resume failed");
                    false
                }
            }
        };

        let state = {
            let mut inner = self.inner.lock();
            inner.grants.audio = audio;
            inner.grants.settle()
        };
        self.transition(state);
        state.is_ready()
    }

    async fn request_one(&self, permission: Permission) -> bool {
        match self.permissions.request(permission).await {
            Ok(()) => true,
            Err(e) => {
                warn!(?permission, error = %e, "permission not granted");
                false
            }
        }
    }

    fn transition(&self, next: CapabilityState) {
        let previous = std::mem::replace(&mut self.inner.lock().capability, next);
        if previous != next {
            debug!(?previous, ?next, "feedback capability changed");
            let _ = self.events.send(Event::CapabilityChanged { state: next, at: Utc::now() });
        }
    }
}

impl std::fmt::Debug for VisibilityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityGate")
            .field("inner", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CapabilityError;
    use crate::gate::StaticVisibility;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct TriggerProbe {
        forced: AtomicUsize,
        foreground: Mutex<Vec<bool>>,
    }

    impl RefreshTrigger for TriggerProbe {
        fn force_refresh(&self) {
            self.forced.fetch_add(1, Ordering::SeqCst);
        }

        fn set_foreground(&self, visible: bool) {
            self.foreground.lock().push(visible);
            if visible {
                self.force_refresh();
            }
        }
    }

    #[derive(Default)]
    struct FakeHost {
        running: AtomicBool,
        deny_audio: AtomicBool,
        deny_wake_lock: AtomicBool,
        hold_acquire: AtomicBool,
        release_acquire: Notify,
        acquires: AtomicUsize,
        resumes: AtomicUsize,
    }

    #[async_trait]
    impl AudioBackend for FakeHost {
        async fn acquire(&self) -> Result<(), CapabilityError> {
            self.acquires.fetch_add(1, Ordering::SeqCst);
            if self.hold_acquire.load(Ordering::SeqCst) {
                self.release_acquire.notified().await;
            }
            if self.deny_audio.load(Ordering::SeqCst) {
                return Err(CapabilityError::new("audio", "not allowed"));
            }
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn resume(&self) -> Result<(), CapabilityError> {
            self.resumes.fetch_add(1, Ordering::SeqCst);
            if self.deny_audio.load(Ordering::SeqCst) {
                return Err(CapabilityError::new("audio", "not allowed"));
            }
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PermissionBroker for FakeHost {
        async fn request(&self, permission: Permission) -> Result<(), CapabilityError> {
            if permission == Permission::WakeLock && self.deny_wake_lock.load(Ordering::SeqCst) {
                return Err(CapabilityError::new("wake_lock", "unsupported"));
            }
            Ok(())
        }
    }

    fn gate(visible: bool, host: Arc<FakeHost>) -> (VisibilityGate, Arc<TriggerProbe>) {
        let trigger = Arc::new(TriggerProbe::default());
        let (events, _) = broadcast::channel(16);
        let gate = VisibilityGate::new(
            &StaticVisibility(visible),
            host.clone(),
            host,
            trigger.clone(),
            events,
        );
        (gate, trigger)
    }

    #[tokio::test]
    async fn starts_locked_and_mirrors_initial_visibility() {
        let (gate, _) = gate(false, Arc::new(FakeHost::default()));
        assert_eq!(
            gate.state(),
            VisibilityState {
                is_foreground_visible: false,
                has_qualifying_interaction: false,
                feedback_channel_ready: false,
            }
        );
        assert_eq!(gate.capability(), CapabilityState::Locked);
    }

    #[tokio::test]
    async fn first_qualifying_interaction_unlocks_once() {
        let host = Arc::new(FakeHost::default());
        let (gate, trigger) = gate(true, host.clone());

        assert!(!gate.on_interaction(InteractionKind::PointerMove).await);
        assert_eq!(gate.capability(), CapabilityState::Locked);

        assert!(gate.on_interaction(InteractionKind::Click).await);
        assert!(!gate.on_interaction(InteractionKind::KeyDown).await);

        assert_eq!(host.acquires.load(Ordering::SeqCst), 1);
        assert_eq!(trigger.forced.load(Ordering::SeqCst), 1);
        assert!(gate.state().has_qualifying_interaction);
        assert!(gate.state().feedback_channel_ready);
    }

    #[tokio::test]
    async fn acquisition_failures_degrade_without_erroring() {
        let host = Arc::new(FakeHost::default());
        host.deny_audio.store(true, Ordering::SeqCst);
        host.deny_wake_lock.store(true, Ordering::SeqCst);
        let (gate, _) = gate(true, host);

        assert!(!gate.request_permissions().await);
        assert_eq!(gate.capability(), CapabilityState::Degraded);
        assert_eq!(
            gate.grants(),
            PermissionGrants {
                audio: false,
                notifications: true,
                wake_lock: false,
            }
        );
    }

    #[tokio::test]
    async fn regaining_visibility_refreshes_and_resumes_audio() {
        let host = Arc::new(FakeHost::default());
        let (gate, trigger) = gate(true, host.clone());
        gate.on_interaction(InteractionKind::TouchStart).await;

        gate.on_visibility_change(false).await;
        // Host suspended the context while hidden.
        host.running.store(false, Ordering::SeqCst);
        gate.on_visibility_change(true).await;

        assert_eq!(*trigger.foreground.lock(), vec![false, true]);
        assert_eq!(trigger.forced.load(Ordering::SeqCst), 2);
        assert_eq!(host.resumes.load(Ordering::SeqCst), 1);
        assert!(gate.state().feedback_channel_ready);
    }

    #[tokio::test]
    async fn repeated_visibility_is_ignored() {
        let host = Arc::new(FakeHost::default());
        let (gate, trigger) = gate(true, host);
        gate.on_visibility_change(true).await;
        assert!(trigger.foreground.lock().is_empty());
        assert_eq!(trigger.forced.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resume_is_idempotent_and_skips_when_running() {
        let host = Arc::new(FakeHost::default());
        let (gate, _) = gate(true, host.clone());
        assert!(!gate.resume_feedback_channel().await, "nothing to resume while locked");

        gate.request_permissions().await;
        assert!(gate.resume_feedback_channel().await);
        assert!(gate.resume_feedback_channel().await);
        assert_eq!(host.resumes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resume_waits_out_a_probe_in_flight() {
        let host = Arc::new(FakeHost::default());
        host.hold_acquire.store(true, Ordering::SeqCst);
        let (gate, _) = gate(true, host.clone());

        let (granted, resumed) = tokio::join!(gate.request_permissions(), async {
            // The request is parked inside `acquire`.
            tokio::task::yield_now().await;
            assert_eq!(gate.capability(), CapabilityState::Probing);
            let resumed = gate.resume_feedback_channel().await;
            host.release_acquire.notify_one();
            resumed
        });

        assert!(granted);
        assert!(!resumed);
        assert_eq!(host.resumes.load(Ordering::SeqCst), 0);
        assert_eq!(gate.capability(), CapabilityState::Granted);
    }

    #[tokio::test]
    async fn successful_resume_recovers_from_degraded() {
        let host = Arc::new(FakeHost::default());
        host.deny_audio.store(true, Ordering::SeqCst);
        let (gate, _) = gate(true, host.clone());
        gate.request_permissions().await;
        assert_eq!(gate.capability(), CapabilityState::Degraded);

        host.deny_audio.store(false, Ordering::SeqCst);
        assert!(gate.resume_feedback_channel().await);
        assert_eq!(gate.capability(), CapabilityState::Granted);
    }

    #[tokio::test]
    async fn handle_routes_host_events() {
        let host = Arc::new(FakeHost::default());
        let (gate, _) = gate(false, host);
        gate.handle(HostEvent::VisibilityChanged(true)).await;
        gate.handle(HostEvent::Interaction(InteractionKind::KeyDown)).await;
        let state = gate.state();
        assert!(state.is_foreground_visible);
        assert!(state.has_qualifying_interaction);
    }
}
