//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the cloud transport, the credential directory,
//! token sources, and metrics.

pub mod directory;
pub mod metrics;
pub mod token;
pub mod transport;
