//! The gateway's own identity.

use serde::Deserialize;

use crate::domain::Identity;

/// Identity the gateway itself connects upstream as.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Device id of the edge device hosting the gateway.
    #[serde(default)]
    pub device_id: String,
    /// Module id of the gateway module.
    #[serde(default = "default_module_id")]
    pub module_id: String,
    /// Cloud hub hostname.
    #[serde(default)]
    pub hostname: String,
}

fn default_module_id() -> String {
    "$edgeHub".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            device_id: String::new(),
            module_id: default_module_id(),
            hostname: String::new(),
        }
    }
}

impl GatewayConfig {
    /// The gateway's identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::module(&self.device_id, &self.module_id, &self.hostname)
    }
}
