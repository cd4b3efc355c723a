//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams where the connectivity core meets collaborators it
//! does not own: the wire-level transport, the identity-scope directory, the
//! gateway's own token source, and the metrics backend.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │   Connectivity core     │
//!                    │                         │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              │                         │              │
//!     │              └─────────────────────────┘              │
//!     │                         │                             │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │Transport│            │  Directory  │              │  Metrics  │
//! │ Adapter │            │   Adapter   │              │   Sink    │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```

pub mod outbound;

pub use outbound::directory::CredentialDirectory;
pub use outbound::metrics::MetricsSink;
pub use outbound::token::TokenSource;
pub use outbound::transport::{
    AuthMethod, Protocol, TransportClient, TransportProvider, TransportSettings,
    TransportStatusHandler,
};
