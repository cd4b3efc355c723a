//! Identity-scope directory port.

use async_trait::async_trait;

use crate::domain::{Identity, TokenCredentials};
use crate::error::Result;

/// Answers whether the gateway acts on behalf of an identity.
#[async_trait]
pub trait CredentialDirectory: Send + Sync {
    /// Credentials derived from the gateway's own identity for `identity`, or
    /// `None` if the identity is outside the gateway's scope.
    async fn delegated_credentials(&self, identity: &Identity)
        -> Result<Option<TokenCredentials>>;
}

/// Directory with nothing in scope; every identity uses its own credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDirectory;

#[async_trait]
impl CredentialDirectory for EmptyDirectory {
    async fn delegated_credentials(
        &self,
        _identity: &Identity,
    ) -> Result<Option<TokenCredentials>> {
        Ok(None)
    }
}
