//! Core error types for loopcue-core.
//!
//! Configuration errors are the only ones a caller ever has to handle.
//! Scheduler and playback errors are caught inside the core, logged, and
//! degrade the session instead of stopping it.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for loopcue-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scheduler-related errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Feedback playback errors
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Config directory could not be created
    #[error("Config directory unavailable: {0}")]
    DirUnavailable(#[source] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Scheduler-specific errors.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// `start` was called outside a tokio runtime
    #[error("No tokio runtime available to drive wake-up sources")]
    NoRuntime,

    /// `start` was called while already running
    #[error("Scheduler is already running")]
    AlreadyRunning,

    /// A single source could not be armed (degraded, not fatal)
    #[error("Wake-up source '{source_name}' unavailable: {message}")]
    SourceUnavailable {
        source_name: &'static str,
        message: String,
    },
}

/// Feedback channel errors. Always transient from the dispatcher's view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The host refused playback (for example, no user gesture yet)
    #[error("Playback not allowed: {0}")]
    NotAllowed(String),

    /// The capability is absent on this host
    #[error("Feedback capability unavailable: {0}")]
    Unavailable(String),

    /// Playback started but failed
    #[error("Playback failed: {0}")]
    Failed(String),
}

/// Errors from acquiring host capabilities (audio context, permissions).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Capability '{capability}' unavailable: {message}")]
pub struct CapabilityError {
    pub capability: &'static str,
    pub message: String,
}

impl CapabilityError {
    pub fn new(capability: &'static str, message: impl Into<String>) -> Self {
        Self {
            capability,
            message: message.into(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
