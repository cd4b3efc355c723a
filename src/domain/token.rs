//! Bearer tokens and the credentials that carry them.
//!
//! Tokens use the shared-access-signature shape
//! `SharedAccessSignature sr=<resource>&sig=<signature>&se=<expiry>`, where
//! `se` is the expiry as unix seconds. Expiry is never cached; it is parsed
//! from the token whenever it is needed.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::identity::Identity;
use crate::error::TokenError;

/// Minimum remaining validity a token must have to be handed out.
pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(5 * 60);

const SAS_PREFIX: &str = "SharedAccessSignature ";

/// Parse the expiry instant encoded in a token.
pub fn expiry(token: &str) -> Result<DateTime<Utc>, TokenError> {
    let fields = token.strip_prefix(SAS_PREFIX).unwrap_or(token);
    let raw = url::form_urlencoded::parse(fields.trim().as_bytes())
        .find(|(key, _)| key == "se")
        .map(|(_, value)| value.into_owned())
        .ok_or(TokenError::MissingExpiry)?;
    let secs: i64 = raw
        .parse()
        .map_err(|_| TokenError::InvalidExpiry(raw.clone()))?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or(TokenError::InvalidExpiry(raw))
}

/// Remaining validity at `now`, or `None` if expired or unparseable.
#[must_use]
pub fn remaining_at(token: &str, now: DateTime<Utc>) -> Option<Duration> {
    let expires_at = expiry(token).ok()?;
    (expires_at - now).to_std().ok().filter(|d| !d.is_zero())
}

/// True when the token is past its expiry. Unparseable tokens count as expired.
#[must_use]
pub fn is_expired(token: &str) -> bool {
    remaining_at(token, Utc::now()).is_none()
}

/// True when the token has strictly more than `buffer` validity left.
#[must_use]
pub fn is_usable(token: &str, buffer: Duration) -> bool {
    remaining_at(token, Utc::now()).is_some_and(|left| left > buffer)
}

/// An identity together with the bearer token it authenticates with.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenCredentials {
    identity: Identity,
    token: String,
}

impl TokenCredentials {
    pub fn new(identity: Identity, token: impl Into<String>) -> Self {
        Self {
            identity,
            token: token.into(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Result<DateTime<Utc>, TokenError> {
        expiry(&self.token)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        is_expired(&self.token)
    }

    #[must_use]
    pub fn is_usable(&self, buffer: Duration) -> bool {
        is_usable(&self.token, buffer)
    }
}

impl std::fmt::Debug for TokenCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the signature.
        f.debug_struct("TokenCredentials")
            .field("identity", &self.identity)
            .field("expires_at", &self.expires_at().ok())
            .finish()
    }
}
