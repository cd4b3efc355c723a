//! Builders for domain primitives used across tests.
//!
//! Tokens are real shared-access-signature strings with an `se=` expiry
//! relative to the wall clock, so token arithmetic behaves as in production.

use chrono::{Duration, Utc};

use crate::domain::{Identity, TokenCredentials};

/// Hostname every test identity lives on.
pub const HOSTNAME: &str = "hub.example.net";

/// Device identity on [`HOSTNAME`].
pub fn device(device_id: &str) -> Identity {
    Identity::device(device_id, HOSTNAME)
}

/// Module identity on [`HOSTNAME`].
pub fn module(device_id: &str, module_id: &str) -> Identity {
    Identity::module(device_id, module_id, HOSTNAME)
}

/// The gateway identity matching [`config::config`](super::config::config).
pub fn gateway() -> Identity {
    module("edge-1", "$edgeHub")
}

/// A token expiring `mins` minutes from now (negative for the past).
pub fn token_valid_for_mins(mins: i64) -> String {
    let se = (Utc::now() + Duration::minutes(mins)).timestamp();
    format!("SharedAccessSignature sr={HOSTNAME}&sig=dGVzdA%3D%3D&se={se}")
}

/// A token that expired five minutes ago.
pub fn expired_token() -> String {
    token_valid_for_mins(-5)
}

/// Credentials for `identity` valid for `mins` minutes.
pub fn credentials(identity: Identity, mins: i64) -> TokenCredentials {
    TokenCredentials::new(identity, token_valid_for_mins(mins))
}
