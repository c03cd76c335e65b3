use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackEvent;
use crate::gate::CapabilityState;
use crate::scheduler::{SchedulerStats, WakeSource};

/// Every notable state change in a session produces an Event.
/// Subscribers receive them over a broadcast channel; the CLI prints them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        cycle_length_secs: f64,
        stride_secs: u32,
        live_sources: Vec<WakeSource>,
        at: DateTime<Utc>,
    },
    FeedbackFired {
        feedback: FeedbackEvent,
        cycle_index: u64,
        at: DateTime<Utc>,
    },
    CycleLengthChanged {
        cycle_length_secs: f64,
        at: DateTime<Utc>,
    },
    VisibilityChanged {
        visible: bool,
        at: DateTime<Utc>,
    },
    /// The feedback channel's capability state moved.
    CapabilityChanged {
        state: CapabilityState,
        at: DateTime<Utc>,
    },
    /// A wake-up source could not be armed; the others keep running.
    SourceDegraded {
        source: WakeSource,
        reason: String,
        at: DateTime<Utc>,
    },
    SessionStopped {
        stats: SchedulerStats,
        at: DateTime<Utc>,
    },
}
