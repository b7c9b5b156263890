//! Checkpoint configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;

/// Strategy used to detect holders outside this instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Try to take an exclusive advisory lock on the marker file.
    #[default]
    AdvisoryLock,
    /// Delete and recreate the marker file; only sees other holders on
    /// platforms that refuse to unlink open files.
    DeleteRecreate,
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeKind::AdvisoryLock => write!(f, "advisory_lock"),
            ProbeKind::DeleteRecreate => write!(f, "delete_recreate"),
        }
    }
}

/// Checkpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Activity probe used by `is_enabled`.
    #[serde(default)]
    pub probe: ProbeKind,

    /// How long `enable` waits for the waiter to report it is parked (ms).
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,

    /// How long `disable` waits for the waiter to let go of the file (ms).
    #[serde(default = "default_release_timeout")]
    pub release_timeout_ms: u64,
}

fn default_ready_timeout() -> u64 {
    5_000
}

fn default_release_timeout() -> u64 {
    5_000
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            probe: ProbeKind::default(),
            ready_timeout_ms: default_ready_timeout(),
            release_timeout_ms: default_release_timeout(),
        }
    }
}

impl CheckpointConfig {
    /// Create a config that uses the given probe.
    pub fn with_probe(probe: ProbeKind) -> Self {
        Self {
            probe,
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a TOML string and validate it.
    pub fn load_str(content: &str) -> Result<Self, CheckpointError> {
        let config: CheckpointConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the readiness timeout as a Duration.
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    /// Get the release timeout as a Duration.
    pub fn release_timeout(&self) -> Duration {
        Duration::from_millis(self.release_timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), CheckpointError> {
        if self.ready_timeout_ms == 0 {
            return Err(CheckpointError::Config(
                "ready_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.release_timeout_ms == 0 {
            return Err(CheckpointError::Config(
                "release_timeout_ms must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
