//! Session configuration, read from RON.
//!
//! ```ron
//! (
//!     history_depth: 50,
//!     autosave: (quiet_period_ms: 800, retry_after_ms: None),
//! )
//! ```
//!
//! Every field is optional; missing ones take the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::DEFAULT_HISTORY_DEPTH;

/// Error type for config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Undo steps kept before the oldest is dropped.
    pub history_depth: usize,
    pub autosave: AutosaveConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            autosave: AutosaveConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Off means saves only happen through `save_now`.
    pub enabled: bool,
    /// Quiet time after the last edit before a save starts.
    pub quiet_period_ms: u64,
    /// Upper bound on a single save.
    pub save_timeout_ms: u64,
    /// Delay before retrying a failed save; `None` waits for the next edit.
    pub retry_after_ms: Option<u64>,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            quiet_period_ms: 1500,
            save_timeout_ms: 10_000,
            retry_after_ms: Some(5000),
        }
    }
}

impl AutosaveConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    pub fn save_timeout(&self) -> Duration {
        Duration::from_millis(self.save_timeout_ms)
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_ms.map(Duration::from_millis)
    }

    /// Autosave turned off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}
