//! Upstream transport configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::port::Protocol;

/// How the gateway talks to the cloud service.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Wire protocol. Overridden by `CLOUDLINK_UPSTREAM_PROTOCOL`.
    #[serde(default)]
    pub protocol: Protocol,
    /// Number of pooled links for multiplexing protocols.
    #[serde(default = "default_connection_pool_size")]
    pub connection_pool_size: usize,
    /// HTTP proxy URL. Falls back to `https_proxy` when unset.
    #[serde(default)]
    pub proxy: Option<String>,
    /// Timeout for open and for each remote operation.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

const fn default_connection_pool_size() -> usize {
    20
}

const fn default_operation_timeout_secs() -> u64 {
    20
}

impl UpstreamConfig {
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            connection_pool_size: default_connection_pool_size(),
            proxy: None,
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}
