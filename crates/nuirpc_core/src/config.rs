//! Bridge configuration.
//!
//! Every field has a default, so a partial JSON document only overrides what
//! it names.

use crate::logging::{default_log_level, normalize_level};
use crate::registry::channel::MAX_CHANNEL_SEED;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Tunables shared by the shared object and the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Channel counter seed; the first channel id is `seed + 1`. At most
    /// [`MAX_CHANNEL_SEED`].
    pub channel_seed: u64,
    /// Emit one debug line per backend resolution attempt.
    pub trace_resolution: bool,
    /// Pending channel count that triggers a leak warning (0 disables).
    pub pending_channel_warn_threshold: usize,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_seed: 0,
            trace_resolution: cfg!(debug_assertions),
            pending_channel_warn_threshold: 64,
            log_level: default_log_level().to_string(),
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_seed > MAX_CHANNEL_SEED {
            return Err(ConfigError::ChannelSeedOutOfRange(self.channel_seed));
        }
        normalize_level(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))?;
        Ok(())
    }
}

/// Configuration load errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    InvalidLogLevel(String),
    ChannelSeedOutOfRange(u64),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid bridge config: {message}"),
            Self::InvalidLogLevel(value) => write!(
                f,
                "unsupported log level `{value}`; expected trace|debug|info|warn|error"
            ),
            Self::ChannelSeedOutOfRange(seed) => write!(
                f,
                "channel_seed {seed} leaves no id headroom; maximum is {MAX_CHANNEL_SEED}"
            ),
        }
    }
}

impl Error for ConfigError {}
