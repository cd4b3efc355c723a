//! Cloudlink - Cloud connectivity core for an edge gateway.
//!
//! The gateway multiplexes many logical identities (devices and modules) over
//! an unreliable upstream link. This crate keeps one cloud connection per
//! identity, rotates tokens without dropping callers, and tracks the health of
//! the link as a whole.
//!
//! # Architecture
//!
//! - **`infrastructure::cloud::ConnectionManager`** - Owns one
//!   `IdentityConnection` per identity; routes status changes, closes idle
//!   connections, and drives connectivity probes
//! - **`infrastructure::cloud::IdentityConnection`** - A transport client plus
//!   its token coordinator; swaps clients when tokens rotate
//! - **`infrastructure::cloud::ConnectivityStateMachine`** - Connected /
//!   Trying / Disconnected with probe timers and device events
//!
//! # Modules
//!
//! - [`adapter`] - Command-line interface
//! - [`domain`] - Identities, tokens, payloads, and status values
//! - [`error`] - Error types for the crate
//! - [`infrastructure`] - Connections, configuration, and metrics
//! - [`port`] - Traits for the transport, directory, token source, and metrics
//!
//! # Features
//!
//! - `testkit` - Mock transports, scripted probes, and canonical fixtures
//!
//! # Example
//!
//! ```no_run
//! use cloudlink::infrastructure::config::settings::Config;
//!
//! let config = Config::load("cloudlink.toml").expect("valid config");
//! println!("gateway: {}", config.gateway.identity());
//! ```

pub mod adapter;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
