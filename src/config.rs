//! Runtime tunables loaded from `~/.hl/config.toml`.
//!
//! This file is optional: a daemon with no config on disk runs with the
//! defaults below. It only carries knobs that aren't part of the wire
//! protocol (reconnection backoff, HTTP timeouts, refresh cadences) —
//! anything a client needs to see or change goes through [`crate::userconfig`]
//! instead.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Backoff/circuit-breaker tunables for the reconnecting push transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReconnectionConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier_millis: u64,
    pub max_consecutive_failures: u32,
    pub circuit_breaker_cooldown_ms: u64,
}

impl ReconnectionConfig {
    /// `backoff_multiplier_millis` stores the multiplier scaled by 1000 so the
    /// struct can derive `Eq`; this returns the `f64` the backoff math wants.
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier_millis as f64 / 1000.0
    }
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier_millis: 2000,
            max_consecutive_failures: 5,
            circuit_breaker_cooldown_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub reconnection: ReconnectionConfig,
    /// Timeout for each outbound HTTP info request, in milliseconds.
    pub http_timeout_ms: u64,
    /// How often to re-pull the full perp meta list over HTTP, in milliseconds.
    pub perp_meta_refresh_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            reconnection: ReconnectionConfig::default(),
            http_timeout_ms: 10_000,
            perp_meta_refresh_ms: 60_000,
        }
    }
}

impl RuntimeConfig {
    /// Loads the config at `path`. A missing file is not an error — it
    /// returns the defaults, matching the daemon's "zero-config" start path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reconnection.initial_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnection.initial_delay_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.reconnection.max_delay_ms < self.reconnection.initial_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "reconnection.max_delay_ms",
                reason: "must be >= initial_delay_ms".into(),
            });
        }
        if self.reconnection.backoff_multiplier() < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnection.backoff_multiplier_millis",
                reason: "multiplier must be >= 1.0".into(),
            });
        }
        if self.reconnection.max_consecutive_failures == 0 {
            return Err(ConfigError::MissingField {
                field: "reconnection.max_consecutive_failures",
            });
        }
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http_timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.perp_meta_refresh_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "perp_meta_refresh_ms",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}
