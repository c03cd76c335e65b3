//! TOML-based application configuration.
//!
//! Stores:
//! - Cycle length
//! - Feedback preferences (mute, speech, stride)
//! - Wake-up source cadences
//!
//! Configuration is stored at `~/.config/loopcue/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::clock::CycleLength;
use crate::error::ConfigError;
use crate::feedback::{FeedbackConfig, Stride};
use crate::scheduler::SchedulerOptions;

/// Cycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSection {
    #[serde(default = "default_length_secs")]
    pub length_secs: u32,
}

/// Feedback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackSection {
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub use_speech: bool,
    #[serde(default = "default_stride_secs")]
    pub stride_secs: u32,
    /// Text-to-speech program invoked by the CLI (for example `espeak`).
    /// Unset means auto-detect.
    #[serde(default)]
    pub speech_program: Option<String>,
}

/// Wake-up source cadences, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_periodic_ms")]
    pub periodic_interval_ms: u64,
    #[serde(default = "default_rearm_ms")]
    pub rearm_delay_ms: u64,
    #[serde(default = "default_frame_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_true")]
    pub heartbeat_enabled: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/loopcue/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cycle: CycleSection,
    #[serde(default)]
    pub feedback: FeedbackSection,
    #[serde(default)]
    pub scheduler: SchedulerSection,
}

/// Typed, checked view of a [`Config`].
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub cycle_length: CycleLength,
    pub feedback: FeedbackConfig,
    pub scheduler: SchedulerOptions,
}

// Default functions
fn default_length_secs() -> u32 {
    60
}
fn default_stride_secs() -> u32 {
    1
}
fn default_periodic_ms() -> u64 {
    50
}
fn default_rearm_ms() -> u64 {
    100
}
fn default_frame_ms() -> u64 {
    16
}
fn default_heartbeat_ms() -> u64 {
    250
}
fn default_true() -> bool {
    true
}

impl Default for CycleSection {
    fn default() -> Self {
        Self {
            length_secs: default_length_secs(),
        }
    }
}

impl Default for FeedbackSection {
    fn default() -> Self {
        Self {
            muted: false,
            use_speech: false,
            stride_secs: default_stride_secs(),
            speech_program: None,
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            periodic_interval_ms: default_periodic_ms(),
            rearm_delay_ms: default_rearm_ms(),
            frame_interval_ms: default_frame_ms(),
            heartbeat_interval_ms: default_heartbeat_ms(),
            heartbeat_enabled: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value
                        .parse::<bool>()
                        .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
                ),
                serde_json::Value::Number(_) => serde_json::Value::Number(
                    value
                        .parse::<u64>()
                        .map_err(|e| ConfigError::invalid(key, e.to_string()))?
                        .into(),
                ),
                // Optional strings serialize as null when unset.
                serde_json::Value::Null if value.is_empty() => serde_json::Value::Null,
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir().map_err(ConfigError::DirUnavailable)?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key, in memory only.
    ///
    /// The result is validated before it replaces `self`, so an out-of-range
    /// value leaves the config untouched.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check every value and build the typed configuration.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let cycle_length = CycleLength::from_secs(self.cycle.length_secs)?;
        let stride = Stride::new(self.feedback.stride_secs)?;

        let ms = |key: &str, value: u64| {
            if value == 0 {
                Err(ConfigError::invalid(key, "interval must be at least 1 ms"))
            } else {
                Ok(Duration::from_millis(value))
            }
        };
        let s = &self.scheduler;
        let scheduler = SchedulerOptions {
            periodic_interval: ms("scheduler.periodic_interval_ms", s.periodic_interval_ms)?,
            rearm_delay: ms("scheduler.rearm_delay_ms", s.rearm_delay_ms)?,
            frame_interval: ms("scheduler.frame_interval_ms", s.frame_interval_ms)?,
            heartbeat_interval: ms("scheduler.heartbeat_interval_ms", s.heartbeat_interval_ms)?,
            heartbeat_enabled: s.heartbeat_enabled,
        };

        Ok(ValidatedConfig {
            cycle_length,
            feedback: FeedbackConfig {
                muted: self.feedback.muted,
                use_speech: self.feedback.use_speech,
                stride,
            },
            scheduler,
        })
    }
}
