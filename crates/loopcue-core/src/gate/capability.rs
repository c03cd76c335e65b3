use serde::{Deserialize, Serialize};

/// Feedback channel capability negotiation.
///
/// ```text
/// Locked -> Probing -> (Granted | Degraded)
/// ```
///
/// A later resume may move between `Granted` and `Degraded` in either
/// direction; nothing ever returns to `Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityState {
    /// No qualifying interaction yet.
    Locked,
    /// Acquisition in progress.
    Probing,
    Granted,
    /// At least one acquisition failed; feedback may be silent.
    Degraded,
}

impl CapabilityState {
    pub fn is_ready(self) -> bool {
        self == CapabilityState::Granted
    }
}

/// Outcome of each individual acquisition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrants {
    pub audio: bool,
    pub notifications: bool,
    pub wake_lock: bool,
}

impl PermissionGrants {
    pub fn all_granted(self) -> bool {
        self.audio && self.notifications && self.wake_lock
    }

    /// The settled state these grants imply.
    pub fn settle(self) -> CapabilityState {
        if self.all_granted() {
            CapabilityState::Granted
        } else {
            CapabilityState::Degraded
        }
    }
}
