//! Gateway domain types: identities, credentials, payloads, and status values.

pub mod identity;
pub mod message;
pub mod status;
pub mod token;

pub use identity::Identity;
pub use message::{Message, Metadata};
pub use status::{ChangeReason, CloudConnectionStatus, ConnectionStatus, StatusChange, StatusHandler};
pub use token::{TokenCredentials, DEFAULT_EXPIRY_BUFFER};
