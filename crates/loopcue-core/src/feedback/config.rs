use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Interval, in seconds, between announced boundary crossings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stride(NonZeroU32);

impl Stride {
    pub const EVERY_SECOND: Stride = Stride(NonZeroU32::MIN);

    pub fn new(secs: u32) -> Result<Self, ConfigError> {
        NonZeroU32::new(secs)
            .map(Self)
            .ok_or_else(|| ConfigError::invalid("feedback.stride_secs", "stride must be at least 1 second"))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Whether a crossing into `rounded` should be announced.
    ///
    /// Zero is never announced for strides above one: the zero boundary is
    /// the same instant as the wrap into the next cycle's last second.
    pub fn admits(self, rounded: u32) -> bool {
        let stride = self.get();
        stride == 1 || (rounded > 0 && rounded % stride == 0)
    }
}

impl Default for Stride {
    fn default() -> Self {
        Self::EVERY_SECOND
    }
}

/// Caller-owned feedback settings. The dispatcher only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedbackConfig {
    pub muted: bool,
    pub use_speech: bool,
    pub stride: Stride,
}
