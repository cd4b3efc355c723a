use thiserror::Error;

use crate::domain::identity::Identity;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors raised by a transport client operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("operation timed out")]
    Timeout,

    #[error("communication failure: {0}")]
    Communication(String),

    #[error("token expired")]
    TokenExpired,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("client is closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether this failure says something about the link rather than the call.
    #[must_use]
    pub const fn is_timeout_shaped(&self) -> bool {
        matches!(self, Self::Timeout | Self::Communication(_))
    }
}

/// Token parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is missing the expiry field")]
    MissingExpiry,

    #[error("invalid expiry value '{0}'")]
    InvalidExpiry(String),
}

/// Coarse classification used to decide how far an error propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeout or socket failure; drives the connectivity state machine.
    TransientNetwork,
    /// Token expired mid-call; resolved by a refresh and reconnect.
    AuthExpired,
    /// Identity rejected by the cloud; local to the caller.
    PermanentAuthFailure,
    /// Anything else.
    Unexpected,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    InvalidToken(#[from] TokenError),

    #[error("authentication failed for {identity}: {reason}")]
    AuthFailure { identity: Identity, reason: String },

    #[error("failed to open transport for {identity}: {source}")]
    TransportOpenFailure {
        identity: Identity,
        #[source]
        source: TransportError,
    },

    #[error("no active cloud connection for {0}")]
    NotConnected(Identity),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(e) | Self::TransportOpenFailure { source: e, .. } => match e {
                e if e.is_timeout_shaped() => ErrorKind::TransientNetwork,
                TransportError::TokenExpired => ErrorKind::AuthExpired,
                TransportError::Unauthorized(_) => ErrorKind::PermanentAuthFailure,
                _ => ErrorKind::Unexpected,
            },
            Self::AuthFailure { .. } => ErrorKind::PermanentAuthFailure,
            Self::InvalidToken(_) => ErrorKind::AuthExpired,
            Self::Io(_) => ErrorKind::TransientNetwork,
            Self::Config(_) | Self::NotConnected(_) | Self::Url(_) => ErrorKind::Unexpected,
        }
    }

    /// True for failures the state machine should count as a timed-out call.
    #[must_use]
    pub fn is_timeout_shaped(&self) -> bool {
        self.kind() == ErrorKind::TransientNetwork
    }
}

pub type Result<T> = std::result::Result<T, Error>;
