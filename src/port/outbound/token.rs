//! Token source port.

use async_trait::async_trait;

use crate::error::Result;

/// A source of bearer tokens for one identity.
///
/// Transport authentication layers call [`token`](Self::token) whenever they
/// need to mint or renew a token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a token suitable for authenticating right now.
    async fn token(&self) -> Result<String>;
}

/// A token source that always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
