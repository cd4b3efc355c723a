//! Token refresh configuration.

use std::time::Duration;

use serde::Deserialize;

/// Token refresh settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// A token with this much validity left or less is treated as stale.
    #[serde(default = "default_expiry_buffer_secs")]
    pub expiry_buffer_secs: u64,
    /// Pause before re-requesting when a delivered token is still stale.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

const fn default_expiry_buffer_secs() -> u64 {
    300 // 5 minutes
}

const fn default_retry_delay_secs() -> u64 {
    10
}

impl TokenConfig {
    #[must_use]
    pub const fn expiry_buffer(&self) -> Duration {
        Duration::from_secs(self.expiry_buffer_secs)
    }

    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            expiry_buffer_secs: default_expiry_buffer_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}
