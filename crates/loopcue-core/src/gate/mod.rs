//! Visibility & interaction gate.
//!
//! Mirrors host visibility into the scheduler and negotiates the feedback
//! channel's permissions, which many hosts only grant after a user gesture.

mod capability;
mod host;
mod visibility;

pub use capability::{CapabilityState, PermissionGrants};
pub use host::{
    AudioBackend, HostEvent, InteractionKind, NoopAudio, Permission, PermissionBroker,
    StaticVisibility, VisibilitySource,
};
pub use visibility::{VisibilityGate, VisibilityState};
