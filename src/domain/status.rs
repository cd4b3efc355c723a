//! Connection status values.

use std::sync::Arc;

use crate::domain::identity::Identity;

/// Raw status reported by a transport client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    /// The client lost the link and is retrying internally.
    DisconnectedRetrying,
    Disconnected,
    /// The client was closed locally.
    Disabled,
}

/// Why a transport status changed, or why a status change was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    ConnectionOk,
    ExpiredToken,
    BadCredential,
    CommunicationError,
    RetryExpired,
    ClientClose,
    /// Raised by the token refresh path rather than the transport.
    TokenNearExpiry,
}

/// Status surfaced to observers of an identity's cloud connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudConnectionStatus {
    ConnectionEstablished,
    Disconnected,
    DisconnectedTokenExpired,
    TokenNearExpiry,
}

impl CloudConnectionStatus {
    /// Map a transport status onto the observer-facing status.
    ///
    /// Returns `None` for transient states that observers should not act on.
    #[must_use]
    pub fn from_transport(status: ConnectionStatus, reason: ChangeReason) -> Option<Self> {
        match (status, reason) {
            (ConnectionStatus::Connected, _) => Some(Self::ConnectionEstablished),
            (ConnectionStatus::DisconnectedRetrying, _) => None,
            (ConnectionStatus::Disconnected, ChangeReason::ExpiredToken) => {
                Some(Self::DisconnectedTokenExpired)
            }
            (ConnectionStatus::Disconnected | ConnectionStatus::Disabled, _) => {
                Some(Self::Disconnected)
            }
        }
    }
}

/// A status change for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub identity: Identity,
    pub status: CloudConnectionStatus,
    pub reason: ChangeReason,
}

/// Receives status changes for one identity.
pub type StatusHandler = Arc<dyn Fn(StatusChange) + Send + Sync>;
