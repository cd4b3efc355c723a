//! Cloud transport port.
//!
//! The connectivity core treats a transport client as an opaque capability
//! set. Any implementation (AMQP, MQTT, over TCP or WebSocket) that honours
//! this contract can be substituted.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::domain::{ChangeReason, ConnectionStatus, Identity, Message, Metadata};
use crate::error::TransportError;
use crate::port::outbound::token::TokenSource;

/// Callback a transport client invokes when its link status changes.
pub type TransportStatusHandler = Arc<dyn Fn(ConnectionStatus, ChangeReason) + Send + Sync>;

/// Upstream wire protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Amqp,
    AmqpWs,
    Mqtt,
    MqttWs,
}

impl Protocol {
    /// True for protocols tunnelled over WebSocket (the only ones a proxy applies to).
    #[must_use]
    pub const fn is_websocket(self) -> bool {
        matches!(self, Self::AmqpWs | Self::MqttWs)
    }

    /// True for protocols that multiplex identities over pooled links.
    #[must_use]
    pub const fn supports_pooling(self) -> bool {
        matches!(self, Self::Amqp | Self::AmqpWs)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Amqp => "amqp",
            Self::AmqpWs => "amqp_ws",
            Self::Mqtt => "mqtt",
            Self::MqttWs => "mqtt_ws",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "amqp" => Ok(Self::Amqp),
            "amqp_ws" | "amqpws" => Ok(Self::AmqpWs),
            "mqtt" => Ok(Self::Mqtt),
            "mqtt_ws" | "mqttws" => Ok(Self::MqttWs),
            other => Err(format!("unknown protocol '{other}'")),
        }
    }
}

/// Gateway-wide transport configuration, fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub protocol: Protocol,
    /// Links shared by multiplexed identities; `None` when the protocol does not pool.
    pub pool_size: Option<usize>,
    /// HTTP proxy; only set for WebSocket protocols.
    pub proxy: Option<Url>,
    /// Upper bound on open and on each remote operation.
    pub operation_timeout: Duration,
}

/// How a transport client authenticates.
#[derive(Clone)]
pub enum AuthMethod {
    /// The identity presents its own token.
    Token {
        identity: Identity,
        source: Arc<dyn TokenSource>,
    },
    /// The gateway authenticates with its own identity and acts for `target`.
    OnBehalfOf {
        target: Identity,
        gateway: Identity,
        source: Arc<dyn TokenSource>,
    },
}

impl AuthMethod {
    /// Identity the resulting client speaks for.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        match self {
            Self::Token { identity, .. } => identity,
            Self::OnBehalfOf { target, .. } => target,
        }
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn TokenSource> {
        match self {
            Self::Token { source, .. } | Self::OnBehalfOf { source, .. } => source,
        }
    }

    #[must_use]
    pub const fn is_delegated(&self) -> bool {
        matches!(self, Self::OnBehalfOf { .. })
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { identity, .. } => {
                f.debug_struct("Token").field("identity", identity).finish()
            }
            Self::OnBehalfOf {
                target, gateway, ..
            } => f
                .debug_struct("OnBehalfOf")
                .field("target", target)
                .field("gateway", gateway)
                .finish(),
        }
    }
}

/// A client holding one logical link to the cloud for one identity.
///
/// Methods take `&self`; implementations are shared behind `Arc` and use
/// interior mutability.
#[async_trait]
pub trait TransportClient: Send + Sync {
    async fn open(&self) -> Result<(), TransportError>;

    async fn close(&self) -> Result<(), TransportError>;

    async fn send(&self, message: Message) -> Result<(), TransportError>;

    async fn get_metadata(&self) -> Result<Metadata, TransportError>;

    async fn update_metadata(&self, patch: Metadata) -> Result<(), TransportError>;

    /// Register the callback for link status changes. Replaces any previous one.
    fn set_status_handler(&self, handler: TransportStatusHandler);

    /// Local view of whether the client is open and usable.
    fn is_active(&self) -> bool;
}

/// Creates unopened transport clients.
pub trait TransportProvider: Send + Sync {
    fn create(
        &self,
        auth: AuthMethod,
        settings: &TransportSettings,
    ) -> Result<Arc<dyn TransportClient>, TransportError>;
}
