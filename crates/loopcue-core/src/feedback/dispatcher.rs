//! Edge-triggered feedback dispatcher.
//!
//! Must be called synchronously inside the same refresh step that produced
//! the snapshot. Playback itself is spawned and never awaited here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::channel::{FeedbackChannel, FeedbackEvent};
use super::config::FeedbackConfig;
use super::edge::EdgeDetector;

pub struct FeedbackDispatcher {
    detector: EdgeDetector,
    config: FeedbackConfig,
    channel: Arc<dyn FeedbackChannel>,
    // Bumped by `cancel`. Spawned playback only runs if it is unchanged.
    generation: Arc<AtomicU64>,
}

impl FeedbackDispatcher {
    pub fn new(config: FeedbackConfig, channel: Arc<dyn FeedbackChannel>) -> Self {
        Self {
            detector: EdgeDetector::new(),
            config,
            channel,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> FeedbackConfig {
        self.config
    }

    pub fn set_config(&mut self, config: FeedbackConfig) {
        self.config = config;
    }

    /// Forget the previous second so the next observation only primes.
    pub fn reset(&mut self) {
        self.detector.reset();
    }

    /// Observe the countdown value and route the resulting event, if any.
    pub fn observe(&mut self, remaining_secs: f64) -> Option<FeedbackEvent> {
        let event = self.decide(remaining_secs)?;
        self.route(event);
        Some(event)
    }

    /// Edge detection plus mute and stride filtering, without side effects on
    /// the channel.
    pub fn decide(&mut self, remaining_secs: f64) -> Option<FeedbackEvent> {
        let crossing = self.detector.observe(remaining_secs)?;
        if self.config.muted {
            trace!(second = crossing.to, "muted, tick suppressed");
            return None;
        }
        if !self.config.stride.admits(crossing.to) {
            return None;
        }
        Some(if self.config.use_speech {
            FeedbackEvent::Speak(crossing.to)
        } else {
            FeedbackEvent::Cue
        })
    }

    /// Cancel any in-flight utterance and drop playback that has been
    /// routed but not started yet. Used on teardown.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.channel.cancel_speech();
    }

    fn route(&self, event: FeedbackEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(?event, "no async runtime, feedback dropped");
            return;
        };

        if matches!(event, FeedbackEvent::Speak(_)) {
            self.channel.cancel_speech();
        }

        debug!(?event, "feedback fired");
        let channel = Arc::clone(&self.channel);
        let generation = Arc::clone(&self.generation);
        let routed_at = generation.load(Ordering::SeqCst);
        runtime.spawn(async move {
            if generation.load(Ordering::SeqCst) != routed_at {
                debug!(?event, "feedback cancelled before playback");
                return;
            }
            let result = match event {
                FeedbackEvent::Cue => channel.play_cue().await,
                FeedbackEvent::Speak(n) => channel.speak(n).await,
            };
            if let Err(e) = result {
                warn!(?event, error = %e, "feedback playback failed");
            }
        });
    }
}

impl std::fmt::Debug for FeedbackDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackDispatcher")
            .field("detector", &self.detector)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
