//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.
//! Avoids each test module defining its own slightly-different defaults.

use crate::infrastructure::config::connectivity::ConnectivityConfig;
use crate::infrastructure::config::gateway::GatewayConfig;
use crate::infrastructure::config::pool::ConnectionPoolConfig;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::config::token::TokenConfig;
use crate::infrastructure::config::upstream::UpstreamConfig;
use crate::port::Protocol;

use super::domain::HOSTNAME;

/// Production buffer, one-second retry delay.
pub fn token() -> TokenConfig {
    TokenConfig {
        expiry_buffer_secs: 300,
        retry_delay_secs: 1,
    }
}

/// Production probe cadence: 300s connected, 120s disconnected.
pub fn connectivity() -> ConnectivityConfig {
    ConnectivityConfig {
        connected_check_interval_secs: 300,
        disconnected_check_interval_secs: 120,
        event_capacity: 64,
    }
}

/// Idle close after 60s, checked every 10s.
pub fn pool() -> ConnectionPoolConfig {
    ConnectionPoolConfig {
        close_on_idle_timeout: true,
        idle_timeout_secs: 60,
        idle_check_interval_secs: 10,
        status_capacity: 256,
    }
}

/// Upstream settings for `protocol` with a 5s operation timeout.
pub fn upstream(protocol: Protocol) -> UpstreamConfig {
    UpstreamConfig {
        protocol,
        connection_pool_size: 4,
        proxy: None,
        operation_timeout_secs: 5,
    }
}

/// Full configuration for the `edge-1/$edgeHub` gateway.
///
/// For tests that need specific behavior, override individual fields on the
/// returned struct.
pub fn config() -> Config {
    Config {
        gateway: GatewayConfig {
            device_id: "edge-1".into(),
            module_id: "$edgeHub".into(),
            hostname: HOSTNAME.into(),
        },
        logging: Default::default(),
        upstream: upstream(Protocol::Amqp),
        token: token(),
        connectivity: connectivity(),
        connection_pool: pool(),
    }
}
