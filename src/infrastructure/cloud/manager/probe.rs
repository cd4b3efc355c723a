//! Connectivity probe through the gateway's own connection.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::message::empty_metadata;
use crate::error::{Error, Result, TransportError};
use crate::infrastructure::cloud::connectivity::ConnectivityProbe;

use super::{ConnectionManager, ManagerRef};

/// Probes the link with an empty metadata update on the gateway's client.
///
/// Uses the uninstrumented client: the state machine classifies the result
/// itself, so the outcome is counted once.
pub struct GatewayProbe {
    manager: ManagerRef,
}

impl GatewayProbe {
    pub fn new(manager: &Arc<ConnectionManager>) -> Self {
        Self {
            manager: Arc::downgrade(manager),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for GatewayProbe {
    async fn probe(&self) -> Result<()> {
        let manager = self
            .manager
            .upgrade()
            .ok_or(Error::Transport(TransportError::Closed))?;
        let gateway = manager.factory().gateway().clone();

        let connection = manager.connection(&gateway, None).await?;
        let client = connection
            .raw_client()
            .ok_or_else(|| Error::NotConnected(gateway.clone()))?;

        let timeout = manager.factory().settings().operation_timeout;
        match tokio::time::timeout(timeout, client.update_metadata(empty_metadata())).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(TransportError::Timeout.into()),
        }
    }
}
