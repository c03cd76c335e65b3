use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What woke the scheduler up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeSource {
    /// Fixed-period interval, the primary driver while foreground.
    Periodic,
    /// Chain of one-shot delays, each re-armed after it fires.
    Rearming,
    /// Redraw-cadence loop, only while foreground-visible.
    Frame,
    /// Beat relayed from the isolated heartbeat thread.
    Heartbeat,
    /// Explicit synchronous refresh (start, visibility regained, reconfigure).
    Forced,
}

impl WakeSource {
    pub fn name(self) -> &'static str {
        match self {
            WakeSource::Periodic => "periodic",
            WakeSource::Rearming => "rearming",
            WakeSource::Frame => "frame",
            WakeSource::Heartbeat => "heartbeat",
            WakeSource::Forced => "forced",
        }
    }
}

/// Cadences for each wake-up source.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub periodic_interval: Duration,
    pub rearm_delay: Duration,
    pub frame_interval: Duration,
    pub heartbeat_interval: Duration,
    pub heartbeat_enabled: bool,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            periodic_interval: Duration::from_millis(50),
            rearm_delay: Duration::from_millis(100),
            frame_interval: Duration::from_millis(16),
            heartbeat_interval: Duration::from_millis(250),
            heartbeat_enabled: true,
        }
    }
}

/// Refresh counts attributed to each source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub periodic: u64,
    pub rearming: u64,
    pub frame: u64,
    pub heartbeat: u64,
    pub forced: u64,
}

impl SchedulerStats {
    pub fn record(&mut self, source: WakeSource) {
        *self.slot(source) += 1;
    }

    pub fn count(&self, source: WakeSource) -> u64 {
        match source {
            WakeSource::Periodic => self.periodic,
            WakeSource::Rearming => self.rearming,
            WakeSource::Frame => self.frame,
            WakeSource::Heartbeat => self.heartbeat,
            WakeSource::Forced => self.forced,
        }
    }

    pub fn total(&self) -> u64 {
        self.periodic + self.rearming + self.frame + self.heartbeat + self.forced
    }

    fn slot(&mut self, source: WakeSource) -> &mut u64 {
        match source {
            WakeSource::Periodic => &mut self.periodic,
            WakeSource::Rearming => &mut self.rearming,
            WakeSource::Frame => &mut self.frame,
            WakeSource::Heartbeat => &mut self.heartbeat,
            WakeSource::Forced => &mut self.forced,
        }
    }
}
