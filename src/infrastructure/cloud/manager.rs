//! Connection manager for per-identity cloud connections.
//!
//! [`ConnectionManager`] owns every [`IdentityConnection`], keyed by
//! identity. Creation and removal for one identity are serialized by a
//! per-identity async lock; different identities never wait on each other.
//!
//! # Background tasks
//!
//! [`ConnectionManager::start`] spawns:
//! - **Status routing**: `TokenNearExpiry` triggers a credential refresh for
//!   identities the gateway can mint tokens for; a disconnect evicts the dead
//!   connection so the next `connect` opens a fresh one.
//! - **Idle management**: closes connections nobody has used for the idle
//!   timeout. The gateway's own connection is never evicted.
//! - **Connectivity probing**: the state machine's probe timer, probing
//!   through the gateway's connection.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{Identity, StatusChange, TokenCredentials};
use crate::error::{Error, Result};
use crate::infrastructure::config::pool::ConnectionPoolConfig;
use crate::port::TransportClient;

use super::connection::IdentityConnection;
use super::connectivity::ConnectivityStateMachine;
use super::factory::ConnectionFactory;
use super::StatusHandler;

mod idle;
mod probe;
mod status;

pub use probe::GatewayProbe;

/// Handles to the manager's background tasks. Dropping aborts them.
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Number of running tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort every task.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

/// Owns the identity connections of one gateway.
pub struct ConnectionManager {
    factory: Arc<ConnectionFactory>,
    monitor: Arc<ConnectivityStateMachine>,
    config: ConnectionPoolConfig,
    connections: DashMap<Identity, Arc<IdentityConnection>>,
    slot_locks: DashMap<Identity, Arc<tokio::sync::Mutex<()>>>,
    credentials: DashMap<Identity, TokenCredentials>,
    status_tx: broadcast::Sender<StatusChange>,
    routing_tx: mpsc::UnboundedSender<StatusChange>,
    routing_rx: Mutex<Option<mpsc::UnboundedReceiver<StatusChange>>>,
}

impl ConnectionManager {
    pub fn new(
        factory: Arc<ConnectionFactory>,
        monitor: Arc<ConnectivityStateMachine>,
        config: ConnectionPoolConfig,
    ) -> Arc<Self> {
        let (status_tx, _) = broadcast::channel(config.status_capacity.max(1));
        let (routing_tx, routing_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            factory,
            monitor,
            config,
            connections: DashMap::new(),
            slot_locks: DashMap::new(),
            credentials: DashMap::new(),
            status_tx,
            routing_tx,
            routing_rx: Mutex::new(Some(routing_rx)),
        })
    }

    /// Spawn the status routing, idle management and probe tasks.
    ///
    /// Status routing can only be started once; later calls skip it.
    pub fn start(self: &Arc<Self>) -> BackgroundTasks {
        let mut handles = Vec::new();

        if let Some(rx) = self.routing_rx.lock().take() {
            handles.push(tokio::spawn(status::status_task(Arc::downgrade(self), rx)));
        }
        if self.config.close_on_idle_timeout {
            handles.push(tokio::spawn(idle::idle_task(
                Arc::downgrade(self),
                self.config.idle_check_interval(),
                self.config.idle_timeout(),
            )));
        }
        handles.push(self.monitor.start(Arc::new(GatewayProbe::new(self))));

        info!(tasks = handles.len(), "Connection manager started");
        BackgroundTasks { handles }
    }

    #[must_use]
    pub fn factory(&self) -> &Arc<ConnectionFactory> {
        &self.factory
    }

    #[must_use]
    pub fn monitor(&self) -> &Arc<ConnectivityStateMachine> {
        &self.monitor
    }

    /// Subscribe to status changes from every identity.
    #[must_use]
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusChange> {
        self.status_tx.subscribe()
    }

    /// Number of connections currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// The connection for `identity`, if one exists.
    #[must_use]
    pub fn get(&self, identity: &Identity) -> Option<Arc<IdentityConnection>> {
        self.connections.get(identity).map(|c| Arc::clone(c.value()))
    }

    /// The instrumented client for `identity`, if connected and active.
    #[must_use]
    pub fn active_client(&self, identity: &Identity) -> Option<Arc<dyn TransportClient>> {
        self.get(identity)?.active_client()
    }

    /// Get or open the connection for `identity` and return its client.
    ///
    /// Supplied credentials are cached for later reconnects. An existing but
    /// inactive connection is replaced.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailure` when no usable credentials exist or the cloud
    /// rejects the identity, and `TransportOpenFailure` for open failures.
    pub async fn connect(
        &self,
        identity: &Identity,
        credentials: Option<TokenCredentials>,
    ) -> Result<Arc<dyn TransportClient>> {
        if let Some(credentials) = &credentials {
            self.cache_credentials(credentials);
        }
        let connection = self.connection(identity, credentials).await?;
        connection
            .active_client()
            .ok_or_else(|| Error::NotConnected(identity.clone()))
    }

    /// Apply rotated credentials.
    ///
    /// Always caches them. Returns the identity's client after the update, or
    /// `None` when the identity has no open connection.
    ///
    /// # Errors
    ///
    /// Propagates a failed client swap; the previous client stays in place.
    pub async fn update_token(
        &self,
        credentials: TokenCredentials,
    ) -> Result<Option<Arc<dyn TransportClient>>> {
        self.cache_credentials(&credentials);
        let Some(connection) = self.get(credentials.identity()) else {
            debug!(
                identity = %credentials.identity(),
                "No connection to update, cached credentials"
            );
            return Ok(None);
        };
        match connection.update_token(credentials).await {
            Ok(client) => Ok(Some(client)),
            // Closed by a concurrent disconnect or eviction; the cache is enough.
            Err(Error::NotConnected(identity)) => {
                debug!(%identity, "Connection closed before update, cached credentials");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove and close the connection for `identity`.
    ///
    /// Returns true if a client was closed.
    pub async fn disconnect(&self, identity: &Identity) -> bool {
        let lock = self.slot_lock(identity);
        let _guard = lock.lock().await;
        match self.connections.remove(identity) {
            Some((_, connection)) => connection.close().await,
            None => false,
        }
    }

    /// Get-or-create under the identity's slot lock.
    pub(crate) async fn connection(
        &self,
        identity: &Identity,
        credentials: Option<TokenCredentials>,
    ) -> Result<Arc<IdentityConnection>> {
        if let Some(existing) = self.get(identity).filter(|c| c.is_active()) {
            return Ok(existing);
        }

        let lock = self.slot_lock(identity);
        let _guard = lock.lock().await;

        if let Some(existing) = self.get(identity) {
            if existing.is_active() {
                return Ok(existing);
            }
            debug!(%identity, "Replacing inactive connection");
            self.connections.remove(identity);
            existing.close().await;
        }

        let credentials =
            credentials.or_else(|| self.credentials.get(identity).map(|c| c.value().clone()));
        let path = self.factory.credential_path(identity, credentials).await?;
        let connection = Arc::new(
            IdentityConnection::create(
                path,
                &self.factory,
                Arc::clone(&self.monitor),
                self.status_handler(),
            )
            .await?,
        );

        self.connections
            .insert(identity.clone(), Arc::clone(&connection));
        Ok(connection)
    }

    /// Drop the connection for `identity` if it is no longer active.
    pub(crate) async fn evict_inactive(&self, identity: &Identity) -> bool {
        let lock = self.slot_lock(identity);
        let _guard = lock.lock().await;

        let removed = self
            .connections
            .remove_if(identity, |_, connection| !connection.is_active());
        match removed {
            Some((_, connection)) => {
                info!(%identity, "Evicting disconnected connection");
                connection.close().await;
                true
            }
            None => false,
        }
    }

    /// Fetch new credentials for `identity` and apply them.
    pub(crate) async fn refresh_token(&self, identity: &Identity) {
        match self.factory.refresh_credentials(identity).await {
            Ok(Some(credentials)) => {
                if let Err(e) = self.update_token(credentials).await {
                    warn!(%identity, error = %e, "Failed to apply refreshed token");
                }
            }
            Ok(None) => {
                debug!(%identity, "Token rotation for this identity is driven by its owner");
            }
            Err(e) => warn!(%identity, error = %e, "Failed to refresh credentials"),
        }
    }

    /// Identities whose connections have been idle for longer than `timeout`.
    ///
    /// The gateway is never included.
    pub(crate) fn idle_identities(&self, timeout: std::time::Duration) -> Vec<Identity> {
        let now = tokio::time::Instant::now();
        self.connections
            .iter()
            .filter(|entry| entry.key() != self.factory.gateway())
            .filter(|entry| now.saturating_duration_since(entry.value().last_used()) > timeout)
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Close the connection for `identity` if it is still idle.
    pub(crate) async fn close_if_idle(&self, identity: &Identity, timeout: std::time::Duration) {
        let lock = self.slot_lock(identity);
        let _guard = lock.lock().await;

        let now = tokio::time::Instant::now();
        let removed = self.connections.remove_if(identity, |_, connection| {
            now.saturating_duration_since(connection.last_used()) > timeout
        });
        if let Some((_, connection)) = removed {
            info!(%identity, idle_secs = timeout.as_secs(), "Closing idle connection");
            connection.close().await;
        }
    }

    fn cache_credentials(&self, credentials: &TokenCredentials) {
        self.credentials
            .insert(credentials.identity().clone(), credentials.clone());
    }

    fn slot_lock(&self, identity: &Identity) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.slot_locks
                .entry(identity.clone())
                .or_default()
                .value(),
        )
    }

    fn status_handler(&self) -> StatusHandler {
        let observers = self.status_tx.clone();
        let routing = self.routing_tx.clone();
        Arc::new(move |change: StatusChange| {
            let _ = routing.send(change.clone());
            let _ = observers.send(change);
        })
    }
}

/// Weak handle used by background tasks; they stop once the manager is gone.
pub(crate) type ManagerRef = Weak<ConnectionManager>;
