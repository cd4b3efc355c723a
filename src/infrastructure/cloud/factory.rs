//! Connection factory.
//!
//! Provides [`ConnectionFactory`], which turns upstream configuration into
//! fixed [`TransportSettings`] and decides how each identity authenticates.

use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use crate::domain::{Identity, TokenCredentials};
use crate::error::{ConfigError, Error, Result};
use crate::infrastructure::config::token::TokenConfig;
use crate::infrastructure::config::upstream::UpstreamConfig;
use crate::port::{
    AuthMethod, CredentialDirectory, TokenSource, TransportProvider, TransportSettings,
};

/// How a connection authenticates. Chosen once, at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPath {
    /// The identity presents its own token.
    Direct(TokenCredentials),
    /// The gateway authenticates as itself and acts for the identity.
    OnBehalfOf {
        gateway: Identity,
        credentials: TokenCredentials,
    },
}

impl CredentialPath {
    /// Identity the connection speaks for.
    #[must_use]
    pub fn identity(&self) -> &Identity {
        self.credentials().identity()
    }

    /// Credentials the connection was created with.
    #[must_use]
    pub fn credentials(&self) -> &TokenCredentials {
        match self {
            Self::Direct(credentials) | Self::OnBehalfOf { credentials, .. } => credentials,
        }
    }

    #[must_use]
    pub const fn is_delegated(&self) -> bool {
        matches!(self, Self::OnBehalfOf { .. })
    }

    /// Auth method for a client that pulls tokens from `source`.
    pub(crate) fn auth_method(&self, source: Arc<dyn TokenSource>) -> AuthMethod {
        match self {
            Self::Direct(credentials) => AuthMethod::Token {
                identity: credentials.identity().clone(),
                source,
            },
            Self::OnBehalfOf {
                gateway,
                credentials,
            } => AuthMethod::OnBehalfOf {
                target: credentials.identity().clone(),
                gateway: gateway.clone(),
                source,
            },
        }
    }
}

/// Build transport settings from `[upstream]`.
///
/// The proxy only applies to WebSocket protocols and the pool size only to
/// AMQP protocols; either is dropped otherwise.
///
/// # Errors
///
/// Returns an error if the proxy is not a valid URL.
pub fn transport_settings(upstream: &UpstreamConfig) -> Result<TransportSettings> {
    let protocol = upstream.protocol;

    let proxy = match upstream.proxy.as_deref() {
        Some(raw) if protocol.is_websocket() => {
            Some(Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
                field: "proxy",
                reason: e.to_string(),
            })?)
        }
        Some(_) => {
            warn!(
                protocol = %protocol,
                "Proxy is only supported over WebSocket protocols, ignoring it"
            );
            None
        }
        None => None,
    };

    let pool_size = protocol
        .supports_pooling()
        .then_some(upstream.connection_pool_size);

    Ok(TransportSettings {
        protocol,
        pool_size,
        proxy,
        operation_timeout: upstream.operation_timeout(),
    })
}

/// Creates the pieces an identity connection needs.
pub struct ConnectionFactory {
    settings: TransportSettings,
    token_config: TokenConfig,
    gateway: Identity,
    gateway_tokens: Arc<dyn TokenSource>,
    provider: Arc<dyn TransportProvider>,
    directory: Arc<dyn CredentialDirectory>,
}

impl ConnectionFactory {
    /// Create a factory.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream configuration is invalid.
    pub fn new(
        upstream: &UpstreamConfig,
        token_config: TokenConfig,
        gateway: Identity,
        gateway_tokens: Arc<dyn TokenSource>,
        provider: Arc<dyn TransportProvider>,
        directory: Arc<dyn CredentialDirectory>,
    ) -> Result<Self> {
        let settings = transport_settings(upstream)?;
        debug!(
            protocol = %settings.protocol,
            pool_size = ?settings.pool_size,
            proxy = settings.proxy.is_some(),
            "Transport settings resolved"
        );
        Ok(Self {
            settings,
            token_config,
            gateway,
            gateway_tokens,
            provider,
            directory,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    #[must_use]
    pub fn token_config(&self) -> &TokenConfig {
        &self.token_config
    }

    /// The gateway's own identity.
    #[must_use]
    pub fn gateway(&self) -> &Identity {
        &self.gateway
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<dyn TransportProvider> {
        &self.provider
    }

    /// Decide how `identity` authenticates.
    ///
    /// The gateway always uses its own token source. Identities in the
    /// gateway's scope go on-behalf-of the gateway; everyone else must bring
    /// their own credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailure` when no credentials are available, or when the
    /// supplied credentials belong to a different identity.
    pub async fn credential_path(
        &self,
        identity: &Identity,
        client_credentials: Option<TokenCredentials>,
    ) -> Result<CredentialPath> {
        if *identity == self.gateway {
            let token = self.gateway_tokens.token().await?;
            return Ok(CredentialPath::Direct(TokenCredentials::new(
                identity.clone(),
                token,
            )));
        }

        if let Some(credentials) = self.directory.delegated_credentials(identity).await? {
            debug!(%identity, "Identity is in scope, connecting on behalf of the gateway");
            return Ok(CredentialPath::OnBehalfOf {
                gateway: self.gateway.clone(),
                credentials,
            });
        }

        match client_credentials {
            Some(credentials) if credentials.identity() == identity => {
                Ok(CredentialPath::Direct(credentials))
            }
            Some(credentials) => Err(Error::AuthFailure {
                identity: identity.clone(),
                reason: format!("credentials belong to {}", credentials.identity()),
            }),
            None => Err(Error::AuthFailure {
                identity: identity.clone(),
                reason: "no credentials available".into(),
            }),
        }
    }

    /// Fresh credentials for identities whose tokens the gateway can mint.
    ///
    /// `None` for identities that bring their own credentials; their rotation
    /// is driven by the caller through `update_token`.
    pub async fn refresh_credentials(
        &self,
        identity: &Identity,
    ) -> Result<Option<TokenCredentials>> {
        if *identity == self.gateway {
            let token = self.gateway_tokens.token().await?;
            return Ok(Some(TokenCredentials::new(identity.clone(), token)));
        }
        self.directory.delegated_credentials(identity).await
    }
}
