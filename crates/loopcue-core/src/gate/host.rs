//! Host collaborators the gate talks to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

/// Input event kinds the host reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    PointerDown,
    KeyDown,
    TouchStart,
    Click,
    PointerMove,
    Wheel,
}

impl InteractionKind {
    /// Only deliberate gestures unlock audio on typical hosts.
    pub fn is_qualifying(self) -> bool {
        matches!(
            self,
            InteractionKind::PointerDown
                | InteractionKind::KeyDown
                | InteractionKind::TouchStart
                | InteractionKind::Click
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HostEvent {
    VisibilityChanged(bool),
    Interaction(InteractionKind),
}

/// Ancillary permissions requested alongside the audio context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Notifications,
    WakeLock,
}

/// Reports whether the host surface is currently foreground-visible.
pub trait VisibilitySource: Send + Sync {
    fn is_visible(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct StaticVisibility(pub bool);

impl VisibilitySource for StaticVisibility {
    fn is_visible(&self) -> bool {
        self.0
    }
}

/// The host's audio processing context.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Create (or reuse) the context and make sure it is running.
    async fn acquire(&self) -> Result<(), CapabilityError>;

    /// Resume a context the host suspended. Safe to call when running.
    async fn resume(&self) -> Result<(), CapabilityError>;

    fn is_running(&self) -> bool;
}

/// Requests host permissions. Implementations may prompt the user.
#[async_trait]
pub trait PermissionBroker: Send + Sync {
    async fn request(&self, permission: Permission) -> Result<(), CapabilityError>;
}

/// For hosts with no audio gating at all: always running, every permission
/// granted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAudio;

#[async_trait]
impl AudioBackend for NoopAudio {
    async fn acquire(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    async fn resume(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn is_running(&self) -> bool {
        true
    }
}

#[async_trait]
impl PermissionBroker for NoopAudio {
    async fn request(&self, _permission: Permission) -> Result<(), CapabilityError> {
        Ok(())
    }
}
