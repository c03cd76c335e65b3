mod cycle;
mod source;

pub use cycle::{compute_snapshot, CycleLength, Snapshot, MAX_CYCLE_SECS};
pub use source::{ClockSource, ManualClock, SystemClock};
