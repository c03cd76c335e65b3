//! # loopcue Core Library
//!
//! Drives a countdown cycle that repeats forever and emits de-duplicated
//! audio or speech feedback on second boundaries, even when the host
//! throttles ordinary timers.
//!
//! ## Architecture
//!
//! - **Cycle Clock**: a pure function of start instant, current instant and
//!   cycle length. Nothing is accumulated, so nothing drifts.
//! - **Redundant Scheduler**: several independent wake-up sources (interval,
//!   re-arming delay, redraw-cadence loop, isolated heartbeat thread) all
//!   refresh the same "now".
//! - **Visibility Gate**: mirrors host visibility and unlocks the feedback
//!   channel on the first qualifying user gesture.
//! - **Feedback Dispatcher**: edge-triggered on the rounded-up remaining
//!   second, filtered by mute and stride.
//!
//! ## Key Components
//!
//! - [`CycleSession`]: everything wired together
//! - [`compute_snapshot`]: the cycle clock
//! - [`RedundantScheduler`]: wake-up source management
//! - [`VisibilityGate`]: capability negotiation
//! - [`FeedbackDispatcher`]: boundary detection and routing
//! - [`Config`]: TOML configuration

pub mod clock;
pub mod error;
pub mod events;
pub mod feedback;
pub mod gate;
pub mod scheduler;
pub mod session;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use clock::{compute_snapshot, ClockSource, CycleLength, ManualClock, Snapshot, SystemClock};
pub use error::{CapabilityError, ConfigError, CoreError, PlaybackError, SchedulerError};
pub use events::Event;
pub use feedback::{FeedbackChannel, FeedbackConfig, FeedbackDispatcher, FeedbackEvent, Stride};
pub use gate::{
    AudioBackend, CapabilityState, HostEvent, InteractionKind, Permission, PermissionBroker,
    VisibilityGate, VisibilitySource, VisibilityState,
};
pub use scheduler::{RedundantScheduler, SchedulerOptions, SchedulerStats, WakeSource};
pub use session::{CycleSession, Host};
pub use storage::{Config, ValidatedConfig};
