//! Cloud connectivity core.
//!
//! - [`token_refresh`]: per-identity token refresh handoff.
//! - [`connection`]: the single live transport client for one identity.
//! - [`connectivity_aware`]: decorator feeding call outcomes to the monitor.
//! - [`connectivity`]: gateway-wide link health state machine.
//! - [`factory`]: transport settings and credential path selection.
//! - [`manager`]: the map of identity connections and its background tasks.

pub mod connection;
pub mod connectivity;
pub mod connectivity_aware;
pub mod factory;
pub mod manager;
pub mod token_refresh;

pub use connection::IdentityConnection;
pub use connectivity::{
    ConnectivityEvent, ConnectivityProbe, ConnectivityState, ConnectivityStateMachine,
};
pub use connectivity_aware::ConnectivityAwareTransport;
pub use factory::{ConnectionFactory, CredentialPath};
pub use manager::ConnectionManager;
pub use token_refresh::TokenRefreshCoordinator;

pub use crate::domain::StatusHandler;
