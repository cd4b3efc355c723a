//! Identity of a device or module endpoint on the cloud side.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Immutable identity of a logical cloud endpoint.
///
/// Used as the key for every piece of per-identity state. Two identities are
/// equal only when device id, module id, and hostname all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    device_id: String,
    module_id: Option<String>,
    hostname: String,
}

impl Identity {
    /// Identity of a device.
    pub fn device(device_id: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            module_id: None,
            hostname: hostname.into(),
        }
    }

    /// Identity of a module hosted on a device.
    pub fn module(
        device_id: impl Into<String>,
        module_id: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            module_id: Some(module_id.into()),
            hostname: hostname.into(),
        }
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    /// Cloud endpoint hostname this identity connects to.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    #[must_use]
    pub fn is_module(&self) -> bool {
        self.module_id.is_some()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.module_id {
            Some(module_id) => write!(f, "{}/{}", self.device_id, module_id),
            None => write!(f, "{}", self.device_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_device_and_module() {
        assert_eq!(Identity::device("d1", "h").to_string(), "d1");
        assert_eq!(Identity::module("d1", "m1", "h").to_string(), "d1/m1");
    }

    #[test]
    fn hostname_participates_in_equality() {
        assert_ne!(Identity::device("d1", "a"), Identity::device("d1", "b"));
        assert_eq!(Identity::device("d1", "a"), Identity::device("d1", "a"));
    }

    #[test]
    fn module_accessors() {
        let id = Identity::module("d1", "m1", "hub");
        assert!(id.is_module());
        assert_eq!(id.module_id(), Some("m1"));
        assert_eq!(id.hostname(), "hub");
        assert!(!Identity::device("d1", "hub").is_module());
    }
}
