//! Cycle clock.
//!
//! A pure function of `(start, now, cycle length)`. There is no accumulated
//! tick count anywhere: every snapshot is re-derived from the wall-clock
//! delta, so redundant or skipped refreshes can never make the cycle drift.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound accepted from configuration (one hour).
pub const MAX_CYCLE_SECS: u32 = 3600;

/// A validated, strictly positive cycle length in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct CycleLength(f64);

impl CycleLength {
    /// Accepts any finite positive length.
    pub fn new(secs: f64) -> Result<Self, ConfigError> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ConfigError::invalid(
                "cycle.length_secs",
                format!("cycle length must be a positive number of seconds, got {secs}"),
            ));
        }
        Ok(Self(secs))
    }

    /// Whole-second lengths as accepted from user configuration (1..=3600).
    pub fn from_secs(secs: u32) -> Result<Self, ConfigError> {
        if secs == 0 || secs > MAX_CYCLE_SECS {
            return Err(ConfigError::invalid(
                "cycle.length_secs",
                format!("must be between 1 and {MAX_CYCLE_SECS}, got {secs}"),
            ));
        }
        Ok(Self(f64::from(secs)))
    }

    pub fn as_secs(self) -> f64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for CycleLength {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        CycleLength::new(secs).map_err(serde::de::Error::custom)
    }
}

/// Derived view of the cycle at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Seconds since the clock's start instant, sub-second precision kept.
    pub elapsed_secs: f64,
    /// Position inside the current cycle, in `[0, L)`.
    pub position_secs: f64,
    /// `position / L`, in `[0, 1)`.
    pub progress: f64,
    /// `L - position`, in `(0, L]`.
    pub remaining_secs: f64,
    /// Number of completed cycles.
    pub cycle_index: u64,
}

impl Snapshot {
    /// The snapshot at the very start of a cycle.
    pub fn initial(cycle_length: CycleLength) -> Self {
        Self {
            elapsed_secs: 0.0,
            position_secs: 0.0,
            progress: 0.0,
            remaining_secs: cycle_length.as_secs(),
            cycle_index: 0,
        }
    }
}

/// Compute the cycle snapshot for `now_ms` given a clock started at `start_ms`.
///
/// Both instants are epoch milliseconds. A `now_ms` earlier than `start_ms`
/// (wall clock stepped backwards) is treated as zero elapsed time.
pub fn compute_snapshot(start_ms: u64, now_ms: u64, cycle_length: CycleLength) -> Snapshot {
    let length = cycle_length.as_secs();
    let elapsed_secs = now_ms.saturating_sub(start_ms) as f64 / 1000.0;

    // Position and index come from one quotient so a wrap moves both.
    let mut cycles = (elapsed_secs / length).floor();
    let mut position_secs = elapsed_secs - cycles * length;
    // The rounded quotient can be one off near a multiple of `length`.
    if position_secs < 0.0 {
        cycles -= 1.0;
        position_secs += length;
    }
    if position_secs >= length {
        cycles += 1.0;
        position_secs = (position_secs - length).max(0.0);
    }

    Snapshot {
        elapsed_secs,
        position_secs,
        progress: position_secs / length,
        remaining_secs: length - position_secs,
        cycle_index: cycles as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn len(secs: f64) -> CycleLength {
        CycleLength::new(secs).unwrap()
    }

    #[test]
    fn rejects_non_positive_lengths() {
        assert!(CycleLength::new(0.0).is_err());
        assert!(CycleLength::new(-3.0).is_err());
        assert!(CycleLength::new(f64::NAN).is_err());
        assert!(CycleLength::new(f64::INFINITY).is_err());
        assert!(CycleLength::from_secs(0).is_err());
        assert!(CycleLength::from_secs(MAX_CYCLE_SECS + 1).is_err());
        assert_eq!(CycleLength::from_secs(60).unwrap().as_secs(), 60.0);
    }

    #[test]
    fn wraps_exactly_at_cycle_end() {
        let snap = compute_snapshot(0, 5000, len(5.0));
        assert!(snap.position_secs.abs() < 1e-9);
        assert!(snap.progress.abs() < 1e-9);
        assert_eq!(snap.remaining_secs, 5.0);
        assert_eq!(snap.cycle_index, 1);
    }

    #[test]
    fn keeps_sub_second_precision() {
        let snap = compute_snapshot(1_000, 3_250, len(10.0));
        assert!((snap.elapsed_secs - 2.25).abs() < 1e-9);
        assert!((snap.position_secs - 2.25).abs() < 1e-9);
        assert!((snap.remaining_secs - 7.75).abs() < 1e-9);
    }

    #[test]
    fn changing_length_reinterprets_elapsed_time() {
        let start = 10_000;
        let now = start + 47_500;
        let before = compute_snapshot(start, now, len(20.0));
        assert!((before.position_secs - 7.5).abs() < 1e-9);

        let after = compute_snapshot(start, now, len(30.0));
        assert!((after.position_secs - 17.5).abs() < 1e-9);
        assert!((after.elapsed_secs - before.elapsed_secs).abs() < 1e-12);
    }

    #[test]
    fn clock_stepping_backwards_reads_as_zero_elapsed() {
        let snap = compute_snapshot(10_000, 9_000, len(30.0));
        assert_eq!(snap.elapsed_secs, 0.0);
        assert_eq!(snap.remaining_secs, 30.0);
    }

    #[test]
    fn index_and_position_agree_near_wraps() {
        for length in [0.1, 0.3, 0.7, 1.1, 2.9] {
            let l = len(length);
            for now in 0..5_000u64 {
                let snap = compute_snapshot(0, now, l);
                assert!(snap.position_secs >= 0.0 && snap.position_secs < length);
                let rebuilt = snap.cycle_index as f64 * length + snap.position_secs;
                assert!(
                    (rebuilt - snap.elapsed_secs).abs() < 1e-9,
                    "length {length} now {now}: index {} position {}",
                    snap.cycle_index,
                    snap.position_secs
                );
            }
        }
    }

    proptest! {
        #[test]
        fn snapshot_invariants_hold(
            start in 0u64..1_000_000_000,
            delta in 0u64..100_000_000,
            length in 0.001f64..3600.0,
        ) {
            let l = len(length);
            let snap = compute_snapshot(start, start + delta, l);
            prop_assert!(snap.position_secs >= 0.0);
            prop_assert!(snap.position_secs < length);
            prop_assert!((snap.progress - snap.position_secs / length).abs() < 1e-9);
            prop_assert!((snap.remaining_secs - (length - snap.position_secs)).abs() < 1e-9);
            prop_assert!(snap.progress >= 0.0);
            let rebuilt = snap.cycle_index as f64 * length + snap.position_secs;
            prop_assert!((rebuilt - snap.elapsed_secs).abs() <= 1e-9 * snap.elapsed_secs.max(1.0));
        }
    }
}
