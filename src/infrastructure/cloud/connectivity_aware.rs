//! Transport decorator that feeds call outcomes to the connectivity state
//! machine.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{Message, Metadata};
use crate::error::TransportError;
use crate::port::{TransportClient, TransportStatusHandler};

use super::connectivity::ConnectivityStateMachine;

/// Wraps a transport client and reports the outcome of every remote call.
///
/// `send`, `get_metadata` and `update_metadata` are instrumented: success
/// reports `CallSucceeded`, a timeout-shaped failure reports `CallTimedOut`.
/// Results are returned unchanged. Open, close, status-handler registration
/// and `is_active` pass straight through.
pub struct ConnectivityAwareTransport {
    inner: Arc<dyn TransportClient>,
    monitor: Arc<ConnectivityStateMachine>,
}

impl ConnectivityAwareTransport {
    pub fn new(inner: Arc<dyn TransportClient>, monitor: Arc<ConnectivityStateMachine>) -> Self {
        Self { inner, monitor }
    }

    /// Wrap `inner` and erase the type.
    pub fn wrap(
        inner: Arc<dyn TransportClient>,
        monitor: Arc<ConnectivityStateMachine>,
    ) -> Arc<dyn TransportClient> {
        Arc::new(Self::new(inner, monitor))
    }

    fn observe<T>(
        &self,
        operation: &'static str,
        result: Result<T, TransportError>,
    ) -> Result<T, TransportError> {
        match &result {
            Ok(_) => self.monitor.call_succeeded(),
            Err(e) if e.is_timeout_shaped() => {
                debug!(operation, error = %e, "Call failed with a link error");
                self.monitor.call_timed_out();
            }
            Err(e) => debug!(operation, error = %e, "Call failed"),
        }
        result
    }
}

#[async_trait]
impl TransportClient for ConnectivityAwareTransport {
    async fn open(&self) -> Result<(), TransportError> {
        self.inner.open().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.close().await
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        let result = self.inner.send(message).await;
        self.observe("send", result)
    }

    async fn get_metadata(&self) -> Result<Metadata, TransportError> {
        let result = self.inner.get_metadata().await;
        self.observe("get_metadata", result)
    }

    async fn update_metadata(&self, patch: Metadata) -> Result<(), TransportError> {
        let result = self.inner.update_metadata(patch).await;
        self.observe("update_metadata", result)
    }

    fn set_status_handler(&self, handler: TransportStatusHandler) {
        self.inner.set_status_handler(handler);
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }
}
