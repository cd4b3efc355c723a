//! Connection manager configuration.

use std::time::Duration;

use serde::Deserialize;

/// Settings for the set of per-identity cloud connections.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionPoolConfig {
    /// Close connections nobody has used for `idle_timeout_secs`.
    #[serde(default = "default_close_on_idle_timeout")]
    pub close_on_idle_timeout: bool,
    /// Idle period after which a connection is closed.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// How often the idle sweep runs.
    #[serde(default = "default_idle_check_interval_secs")]
    pub idle_check_interval_secs: u64,
    /// Capacity of the status-change broadcast channel.
    #[serde(default = "default_status_capacity")]
    pub status_capacity: usize,
}

const fn default_close_on_idle_timeout() -> bool {
    true
}

const fn default_idle_timeout_secs() -> u64 {
    3600 // 1 hour
}

const fn default_idle_check_interval_secs() -> u64 {
    60
}

const fn default_status_capacity() -> usize {
    1024
}

impl ConnectionPoolConfig {
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    #[must_use]
    pub const fn idle_check_interval(&self) -> Duration {
        Duration::from_secs(self.idle_check_interval_secs)
    }
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            close_on_idle_timeout: default_close_on_idle_timeout(),
            idle_timeout_secs: default_idle_timeout_secs(),
            idle_check_interval_secs: default_idle_check_interval_secs(),
            status_capacity: default_status_capacity(),
        }
    }
}
