//! Isolated heartbeat.
//!
//! Runs on its own OS thread with its own timer, outside the async runtime,
//! so runtime-level throttling of timers does not stretch its period. Beats
//! are reported back over a channel; the thread never touches the core.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

#[derive(Debug)]
pub struct HeartbeatThread {
    stop_tx: Option<mpsc::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl HeartbeatThread {
    /// Spawn the heartbeat thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be created. Callers treat
    /// this as a missing capability, not a fatal error.
    pub fn spawn(interval: Duration, beats: UnboundedSender<()>) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let join = std::thread::Builder::new()
            .name("loopcue-heartbeat".into())
            .spawn(move || loop {
                // The stop channel doubles as the sleep: dropping the sender
                // wakes the thread immediately.
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if beats.send(()).is_err() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        debug!(interval_ms = interval.as_millis() as u64, "heartbeat thread spawned");
        Ok(Self {
            stop_tx: Some(stop_tx),
            join: Some(join),
        })
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
            debug!("heartbeat thread joined");
        }
    }
}

impl Drop for HeartbeatThread {
    fn drop(&mut self) {
        self.stop();
    }
}
