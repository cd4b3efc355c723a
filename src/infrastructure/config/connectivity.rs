//! Connectivity probing configuration.

use std::time::Duration;

use serde::Deserialize;

/// Probe cadence for the connectivity state machine.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
    /// Probe interval while connected and idle (low frequency).
    #[serde(default = "default_connected_check_secs")]
    pub connected_check_interval_secs: u64,
    /// Probe interval while disconnected (high frequency).
    #[serde(default = "default_disconnected_check_secs")]
    pub disconnected_check_interval_secs: u64,
    /// Capacity of the connectivity event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

const fn default_connected_check_secs() -> u64 {
    300 // 5 minutes
}

const fn default_disconnected_check_secs() -> u64 {
    120 // 2 minutes
}

const fn default_event_capacity() -> usize {
    64
}

impl ConnectivityConfig {
    #[must_use]
    pub const fn connected_interval(&self) -> Duration {
        Duration::from_secs(self.connected_check_interval_secs)
    }

    #[must_use]
    pub const fn disconnected_interval(&self) -> Duration {
        Duration::from_secs(self.disconnected_check_interval_secs)
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            connected_check_interval_secs: default_connected_check_secs(),
            disconnected_check_interval_secs: default_disconnected_check_secs(),
            event_capacity: default_event_capacity(),
        }
    }
}
