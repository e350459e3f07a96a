//! Session sweep configuration.

use serde::{Deserialize, Serialize};

/// Session sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Interval between purge sweeps, in minutes. `0` disables the sweep.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,
    /// How long after expiry (or deactivation) a session row is kept, in
    /// minutes. Must cover the refresh TTL for refresh to keep working.
    #[serde(default = "default_purge_grace")]
    pub purge_grace_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_minutes: default_cleanup_interval(),
            purge_grace_minutes: default_purge_grace(),
        }
    }
}

fn default_cleanup_interval() -> u64 {
    15
}

fn default_purge_grace() -> u64 {
    60 * 24
}
