//! Status routing task.

use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::{CloudConnectionStatus, StatusChange};

use super::ManagerRef;

/// Route status changes from every identity connection.
///
/// Each change is handled on its own task so a slow token swap for one
/// identity does not hold up the others. Ends when the manager is dropped.
pub(super) async fn status_task(
    manager: ManagerRef,
    mut rx: mpsc::UnboundedReceiver<StatusChange>,
) {
    debug!("Status routing task started");

    while let Some(change) = rx.recv().await {
        let Some(manager) = manager.upgrade() else {
            break;
        };
        let identity = change.identity;

        match change.status {
            CloudConnectionStatus::TokenNearExpiry => {
                tokio::spawn(async move { manager.refresh_token(&identity).await });
            }
            CloudConnectionStatus::DisconnectedTokenExpired
            | CloudConnectionStatus::Disconnected => {
                tokio::spawn(async move {
                    manager.evict_inactive(&identity).await;
                });
            }
            CloudConnectionStatus::ConnectionEstablished => {
                debug!(%identity, "Connection established");
            }
        }
    }

    debug!("Status routing task stopped");
}
