use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_COMMIT_TIMEOUT_MS: u64 = 20_000;
const DEFAULT_COORDINATION_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Handshake timeout used when a request does not carry one.
    pub commit_timeout_ms: u64,
    /// Upper bound applied to every requested handshake timeout.
    pub commit_timeout_ceiling_ms: u64,
    /// Capacity of the coordination channel.
    pub coordination_capacity: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        BackupConfig {
            commit_timeout_ms: DEFAULT_COMMIT_TIMEOUT_MS,
            commit_timeout_ceiling_ms: DEFAULT_COMMIT_TIMEOUT_MS,
            coordination_capacity: DEFAULT_COORDINATION_CAPACITY,
        }
    }
}

impl BackupConfig {
    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }

    pub fn commit_timeout_ceiling(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ceiling_ms)
    }

    /// Effective handshake timeout for a requested duration.
    /// Zero falls back to the configured default.
    pub fn clamp_timeout(&self, requested: Duration) -> Duration {
        let requested = if requested.is_zero() {
            self.commit_timeout()
        } else {
            requested
        };
        requested.min(self.commit_timeout_ceiling())
    }
}

pub fn load_config(path: &str) -> Result<BackupConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config from {path}"))?;
    let cfg: BackupConfig = serde_yaml::from_str(&content).context("Failed to parse YAML config")?;
    Ok(cfg)
}
