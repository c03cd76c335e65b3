//! Second-boundary edge detection.

/// A change of the rounded-up second between two observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub from: u32,
    pub to: u32,
}

/// Remembers the last rounded second it saw.
///
/// The very first observation after construction or [`reset`](Self::reset)
/// only primes the detector; it never reports a crossing.
#[derive(Debug, Clone, Default)]
pub struct EdgeDetector {
    previous: Option<u32>,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn previous(&self) -> Option<u32> {
        self.previous
    }

    /// Feed one observed countdown value. The stored second is updated
    /// unconditionally; only the return value depends on the comparison.
    pub fn observe(&mut self, value_secs: f64) -> Option<Crossing> {
        let rounded = round_up(value_secs);
        let previous = self.previous.replace(rounded)?;
        (previous != rounded).then_some(Crossing {
            from: previous,
            to: rounded,
        })
    }
}

fn round_up(value_secs: f64) -> u32 {
    // Negative and NaN inputs saturate to 0 in the cast.
    value_secs.ceil() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_never_crosses() {
        for value in [0.0, 0.4, 12.0, 29.8] {
            let mut detector = EdgeDetector::new();
            assert_eq!(detector.observe(value), None);
            assert_eq!(detector.previous(), Some(value.ceil() as u32));
        }
    }

    #[test]
    fn crossing_reported_once_per_second() {
        let mut detector = EdgeDetector::new();
        detector.observe(29.8);
        assert_eq!(detector.observe(28.9), Some(Crossing { from: 30, to: 29 }));
        assert_eq!(detector.observe(28.5), None);
        assert_eq!(detector.observe(28.1), None);
        assert_eq!(detector.observe(27.99), Some(Crossing { from: 29, to: 28 }));
    }

    #[test]
    fn same_rounded_second_is_not_a_crossing() {
        let mut detector = EdgeDetector::new();
        detector.observe(29.9);
        assert_eq!(detector.observe(29.1), None);
    }

    #[test]
    fn wrap_around_counts_as_crossing() {
        let mut detector = EdgeDetector::new();
        detector.observe(0.2);
        assert_eq!(detector.observe(9.95), Some(Crossing { from: 1, to: 10 }));
    }

    #[test]
    fn reset_reprimes() {
        let mut detector = EdgeDetector::new();
        detector.observe(5.5);
        detector.reset();
        assert_eq!(detector.previous(), None);
        assert_eq!(detector.observe(3.2), None);
    }
}
