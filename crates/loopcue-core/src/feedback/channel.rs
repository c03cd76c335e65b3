use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;

/// One routed feedback call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FeedbackEvent {
    Cue,
    Speak(u32),
}

/// The host's audio/speech output.
///
/// Both playback calls are best-effort and independently failable. The
/// dispatcher never awaits them on the refresh path.
#[async_trait]
pub trait FeedbackChannel: Send + Sync {
    /// Play the short cue from its beginning, cutting off any cue still
    /// sounding.
    async fn play_cue(&self) -> Result<(), PlaybackError>;

    /// Speak `n`.
    async fn speak(&self, n: u32) -> Result<(), PlaybackError>;

    /// Drop any utterance that is queued or in flight. Must not block.
    fn cancel_speech(&self);
}

/// A channel for hosts without audio. Every call succeeds and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentChannel;

#[async_trait]
impl FeedbackChannel for SilentChannel {
    async fn play_cue(&self) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn speak(&self, _n: u32) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn cancel_speech(&self) {}
}
