//! Payloads carried through to the transport.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// JSON metadata document (reported-properties style).
pub type Metadata = serde_json::Value;

/// An opaque cloud-bound message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub body: Vec<u8>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Message {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Attach an application property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Empty metadata patch, used by connectivity probes.
#[must_use]
pub fn empty_metadata() -> Metadata {
    serde_json::Value::Object(serde_json::Map::new())
}
