//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`transport`]: [`MockTransport`](transport::MockTransport) and
//!   [`MockTransportProvider`](transport::MockTransportProvider) with scripted
//!   open and call results.
//! - [`probe`]: A scripted connectivity probe.
//! - [`domain`]: Builders for identities, tokens, and credentials.
//! - [`config`]: Canonical test configurations.
//! - [`status`]: Status handlers that forward into channels.

pub mod config;
pub mod domain;
pub mod probe;
pub mod status;
pub mod transport;
