//! Redundant scheduler.
//!
//! Several independent wake-up sources all call the same idempotent refresh
//! on one shared [`CycleCore`]. No source is trusted to keep firing while the
//! host is backgrounded; together they bound how stale "now" can get.
//!
//! ```text
//! Stopped -> Running -> Stopped
//! ```

mod core;
mod heartbeat;
mod redundant;
mod source;

pub use self::core::CycleCore;
pub use heartbeat::HeartbeatThread;
pub use redundant::{RedundantScheduler, RefreshTrigger};
pub use source::{SchedulerOptions, SchedulerStats, WakeSource};
