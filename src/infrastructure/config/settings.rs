//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all gateway settings.
//! Configuration is loaded from a TOML file, with environment variable
//! overrides for the upstream protocol and proxy.
//!
//! # Example
//!
//! ```no_run
//! use cloudlink::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("cloudlink.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use url::Url;

use super::connectivity::ConnectivityConfig;
use super::gateway::GatewayConfig;
use super::logging::LoggingConfig;
use super::pool::ConnectionPoolConfig;
use super::token::TokenConfig;
use super::upstream::UpstreamConfig;
use crate::error::{ConfigError, Result};

/// Environment variable overriding `[upstream] protocol`.
pub const PROTOCOL_ENV: &str = "CLOUDLINK_UPSTREAM_PROTOCOL";

/// Environment variables consulted for a proxy when none is configured.
const PROXY_ENVS: [&str; 2] = ["https_proxy", "HTTPS_PROXY"];

/// Main gateway configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// The gateway's own identity.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Transport protocol, pooling, proxy, and timeouts.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Token refresh behavior.
    #[serde(default)]
    pub token: TokenConfig,

    /// Connectivity probe cadence.
    #[serde(default)]
    pub connectivity: ConnectivityConfig,

    /// Per-identity connection management.
    #[serde(default)]
    pub connection_pool: ConnectionPoolConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// Environment overrides are applied before validation.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is
    /// malformed, or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(PROTOCOL_ENV).filter(|v| !v.trim().is_empty()) {
            self.upstream.protocol =
                raw.parse()
                    .map_err(|reason| ConfigError::InvalidValue {
                        field: PROTOCOL_ENV,
                        reason,
                    })?;
        }

        if self.upstream.proxy.is_none() {
            self.upstream.proxy = PROXY_ENVS
                .iter()
                .find_map(|key| lookup(key))
                .filter(|v| !v.trim().is_empty());
        }

        Ok(())
    }

    /// Initialize tracing from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str, reason: &str| -> crate::error::Error {
            ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            }
            .into()
        };

        if self.gateway.device_id.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "device_id" }.into());
        }
        if self.gateway.hostname.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "hostname" }.into());
        }
        if self.gateway.module_id.trim().is_empty() {
            return Err(invalid("module_id", "must not be empty"));
        }

        if !self.logging.is_known_format() {
            return Err(invalid("format", "must be \"pretty\" or \"json\""));
        }

        if self.upstream.operation_timeout_secs == 0 {
            return Err(invalid("operation_timeout_secs", "must be greater than 0"));
        }
        if self.upstream.connection_pool_size == 0 {
            return Err(invalid("connection_pool_size", "must be greater than 0"));
        }
        if let Some(proxy) = &self.upstream.proxy {
            let url = Url::parse(proxy).map_err(|e| ConfigError::InvalidValue {
                field: "proxy",
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid("proxy", "scheme must be http or https"));
            }
        }

        if self.token.retry_delay_secs == 0 {
            return Err(invalid("retry_delay_secs", "must be greater than 0"));
        }

        if self.connectivity.connected_check_interval_secs == 0 {
            return Err(invalid(
                "connected_check_interval_secs",
                "must be greater than 0",
            ));
        }
        if self.connectivity.disconnected_check_interval_secs == 0 {
            return Err(invalid(
                "disconnected_check_interval_secs",
                "must be greater than 0",
            ));
        }
        if self.connectivity.event_capacity == 0 {
            return Err(invalid("event_capacity", "must be greater than 0"));
        }

        let pool = &self.connection_pool;
        if pool.status_capacity == 0 {
            return Err(invalid("status_capacity", "must be greater than 0"));
        }
        if pool.close_on_idle_timeout {
            if pool.idle_timeout_secs == 0 {
                return Err(invalid("idle_timeout_secs", "must be greater than 0"));
            }
            if pool.idle_check_interval_secs == 0 {
                return Err(invalid(
                    "idle_check_interval_secs",
                    "must be greater than 0",
                ));
            }
        }

        Ok(())
    }
}
