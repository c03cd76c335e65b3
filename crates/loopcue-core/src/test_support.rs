//! Shared test doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::PlaybackError;
use crate::feedback::{FeedbackChannel, FeedbackEvent};

/// Records every call; optionally fails playback.
#[derive(Default)]
pub(crate) struct RecordingChannel {
    pub played: Mutex<Vec<FeedbackEvent>>,
    pub cancels: AtomicUsize,
    pub fail: AtomicBool,
}

impl RecordingChannel {
    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.played.lock().clone()
    }

    fn record(&self, event: FeedbackEvent) -> Result<(), PlaybackError> {
        self.played.lock().push(event);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlaybackError::Failed("device busy".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedbackChannel for RecordingChannel {
    async fn play_cue(&self) -> Result<(), PlaybackError> {
        self.record(FeedbackEvent::Cue)
    }

    async fn speak(&self, n: u32) -> Result<(), PlaybackError> {
        self.record(FeedbackEvent::Speak(n))
    }

    fn cancel_speech(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Let spawned playback tasks run to completion.
pub(crate) async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
