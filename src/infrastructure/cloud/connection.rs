//! The live cloud connection for one identity.
//!
//! An [`IdentityConnection`] owns exactly one transport client at a time.
//! Clients are never mutated in place: a token rotation that cannot be served
//! by the pending refresh request opens a brand-new client and only then
//! closes the old one.
//!
//! Every client is tagged with a generation. Status events are delivered to
//! the identity's [`StatusHandler`] only when they come from the current
//! generation and callbacks are enabled, so a client that has been swapped
//! out can never speak for the identity again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{
    ChangeReason, CloudConnectionStatus, ConnectionStatus, Identity, StatusChange,
    TokenCredentials,
};
use crate::error::{Error, Result, TransportError};
use crate::port::{
    TokenSource, TransportClient, TransportProvider, TransportSettings, TransportStatusHandler,
};

use super::connectivity::ConnectivityStateMachine;
use super::connectivity_aware::ConnectivityAwareTransport;
use super::factory::{ConnectionFactory, CredentialPath};
use super::token_refresh::TokenRefreshCoordinator;
use super::StatusHandler;

/// Generation value that matches no client.
const NO_GENERATION: u64 = 0;

struct ClientSlot {
    client: Arc<dyn TransportClient>,
    generation: u64,
    active: bool,
}

/// State shared with transport status callbacks.
struct Shared {
    identity: Identity,
    status_handler: StatusHandler,
    callbacks_enabled: AtomicBool,
    current_generation: AtomicU64,
    slot: Mutex<Option<ClientSlot>>,
}

impl Shared {
    fn on_transport_status(
        &self,
        generation: u64,
        status: ConnectionStatus,
        reason: ChangeReason,
    ) {
        if generation != self.current_generation.load(Ordering::SeqCst) {
            debug!(
                identity = %self.identity,
                generation,
                ?status,
                "Ignoring status from a replaced client"
            );
            return;
        }

        if matches!(status, ConnectionStatus::Disconnected | ConnectionStatus::Disabled) {
            if let Some(slot) = self.slot.lock().as_mut() {
                if slot.generation == generation {
                    slot.active = false;
                }
            }
        }

        if !self.callbacks_enabled.load(Ordering::SeqCst) {
            debug!(identity = %self.identity, ?status, "Status suppressed during token update");
            return;
        }

        let Some(mapped) = CloudConnectionStatus::from_transport(status, reason) else {
            debug!(identity = %self.identity, ?reason, "Transport retrying");
            return;
        };
        info!(
            identity = %self.identity,
            status = ?mapped,
            ?reason,
            "Cloud connection status changed"
        );
        self.emit(mapped, reason);
    }

    fn pause_callbacks(&self) -> CallbacksPaused<'_> {
        self.callbacks_enabled.store(false, Ordering::SeqCst);
        CallbacksPaused(&self.callbacks_enabled)
    }

    fn emit(&self, status: CloudConnectionStatus, reason: ChangeReason) {
        (self.status_handler)(StatusChange {
            identity: self.identity.clone(),
            status,
            reason,
        });
    }
}

/// Re-enables status callbacks when dropped, including when a token update is
/// cancelled mid-swap.
struct CallbacksPaused<'a>(&'a AtomicBool);

impl Drop for CallbacksPaused<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Owns the single live transport client for one identity.
pub struct IdentityConnection {
    shared: Arc<Shared>,
    path: CredentialPath,
    coordinator: Arc<TokenRefreshCoordinator>,
    /// Serializes token updates and close.
    swap_lock: tokio::sync::Mutex<()>,
    /// Set by `close`; a closed connection never opens another client.
    closed: AtomicBool,
    next_generation: AtomicU64,
    last_used: Mutex<Instant>,
    settings: TransportSettings,
    provider: Arc<dyn TransportProvider>,
    monitor: Arc<ConnectivityStateMachine>,
}

impl IdentityConnection {
    /// Create a transport client for `path` and open it.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailure` if the cloud rejects the identity and
    /// `TransportOpenFailure` for any other open failure, including the open
    /// not completing within the operation timeout.
    pub async fn create(
        path: CredentialPath,
        factory: &ConnectionFactory,
        monitor: Arc<ConnectivityStateMachine>,
        status_handler: StatusHandler,
    ) -> Result<Self> {
        let identity = path.identity().clone();
        let shared = Arc::new(Shared {
            identity: identity.clone(),
            status_handler,
            callbacks_enabled: AtomicBool::new(true),
            current_generation: AtomicU64::new(NO_GENERATION),
            slot: Mutex::new(None),
        });
        let coordinator = Arc::new(TokenRefreshCoordinator::new(
            identity.clone(),
            path.credentials().token(),
            factory.token_config(),
            near_expiry_handler(&shared),
        ));

        let connection = Self {
            shared,
            path,
            coordinator: Arc::clone(&coordinator),
            swap_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
            next_generation: AtomicU64::new(NO_GENERATION + 1),
            last_used: Mutex::new(Instant::now()),
            settings: factory.settings().clone(),
            provider: Arc::clone(factory.provider()),
            monitor,
        };

        let slot = connection.open_client(&coordinator, true).await?;
        *connection.shared.slot.lock() = Some(slot);
        info!(
            identity = %identity,
            delegated = connection.path.is_delegated(),
            "Cloud connection opened"
        );
        Ok(connection)
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.shared.identity
    }

    #[must_use]
    pub fn credential_path(&self) -> &CredentialPath {
        &self.path
    }

    /// The coordinator serving token requests for every client of this
    /// identity.
    #[must_use]
    pub fn token_coordinator(&self) -> Arc<TokenRefreshCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// When [`active_client`](Self::active_client) last handed out the client.
    #[must_use]
    pub fn last_used(&self) -> Instant {
        *self.last_used.lock()
    }

    /// Whether the current client is marked active and reports itself active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.raw_client().is_some()
    }

    /// The current client wrapped in [`ConnectivityAwareTransport`], if active.
    pub fn active_client(&self) -> Option<Arc<dyn TransportClient>> {
        let client = self.raw_client()?;
        *self.last_used.lock() = Instant::now();
        Some(ConnectivityAwareTransport::wrap(
            client,
            Arc::clone(&self.monitor),
        ))
    }

    /// The current client without outcome reporting, if active.
    ///
    /// Connectivity probes use this so their outcome is reported once, by the
    /// state machine itself.
    #[must_use]
    pub fn raw_client(&self) -> Option<Arc<dyn TransportClient>> {
        let slot = self.shared.slot.lock();
        slot.as_ref()
            .filter(|s| s.active && s.client.is_active())
            .map(|s| Arc::clone(&s.client))
    }

    /// Apply new credentials.
    ///
    /// If a token request is outstanding and the token is not expired, it is
    /// handed to that request and the current client is kept. Otherwise a new
    /// client is opened with the new token and the old one is closed once the
    /// new one is up. A failed open leaves the old client in place. Callers
    /// still waiting on the previous token are handed the new one.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailure` if the credentials are for another identity,
    /// `NotConnected` once the connection has been closed, or the open error
    /// of the replacement client.
    pub async fn update_token(
        &self,
        credentials: TokenCredentials,
    ) -> Result<Arc<dyn TransportClient>> {
        if credentials.identity() != self.identity() {
            return Err(Error::AuthFailure {
                identity: self.identity().clone(),
                reason: format!("credentials belong to {}", credentials.identity()),
            });
        }

        let _guard = self.swap_lock.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::NotConnected(self.identity().clone()));
        }
        let _paused = self.shared.pause_callbacks();
        self.swap_locked(&credentials).await
    }

    async fn swap_locked(
        &self,
        credentials: &TokenCredentials,
    ) -> Result<Arc<dyn TransportClient>> {
        let coordinator = &self.coordinator;
        if coordinator.has_pending() && !credentials.is_expired() {
            if let Some(client) = self.raw_client() {
                if coordinator.replace_token(credentials.token()) {
                    info!(identity = %self.identity(), "Refreshed token handed to pending request");
                    return Ok(ConnectivityAwareTransport::wrap(
                        client,
                        Arc::clone(&self.monitor),
                    ));
                }
            }
        }

        debug!(identity = %self.identity(), "Opening replacement client with new token");
        // The replacement authenticates with the new token; waiters on the old
        // client are released with it too.
        coordinator.replace_token(credentials.token());
        let slot = self.open_client(coordinator, false).await?;
        let client = Arc::clone(&slot.client);

        let previous = {
            let mut current = self.shared.slot.lock();
            self.shared
                .current_generation
                .store(slot.generation, Ordering::SeqCst);
            current.replace(slot)
        };

        if let Some(old) = previous {
            close_client(self.identity(), &old.client, self.settings.operation_timeout).await;
        }
        info!(identity = %self.identity(), "Transport client replaced");

        Ok(ConnectivityAwareTransport::wrap(
            client,
            Arc::clone(&self.monitor),
        ))
    }

    /// Close the current client.
    ///
    /// Returns true if a client was closed without error.
    pub async fn close(&self) -> bool {
        let _guard = self.swap_lock.lock().await;
        self.closed.store(true, Ordering::SeqCst);
        let taken = {
            let mut slot = self.shared.slot.lock();
            self.shared
                .current_generation
                .store(NO_GENERATION, Ordering::SeqCst);
            slot.take()
        };

        match taken {
            Some(slot) => {
                let closed =
                    close_client(self.identity(), &slot.client, self.settings.operation_timeout)
                        .await;
                info!(identity = %self.identity(), "Cloud connection closed");
                closed
            }
            None => false,
        }
    }

    /// Create, register and open a client whose tokens come from `coordinator`.
    ///
    /// With `make_current`, the new generation is current before open so the
    /// initial `Connected` event reaches observers.
    async fn open_client(
        &self,
        coordinator: &Arc<TokenRefreshCoordinator>,
        make_current: bool,
    ) -> Result<ClientSlot> {
        let identity = self.identity();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let source: Arc<dyn TokenSource> = coordinator.clone();
        let auth = self.path.auth_method(source);

        let client = self
            .provider
            .create(auth, &self.settings)
            .map_err(|e| open_error(identity, e))?;
        client.set_status_handler(status_callback(&self.shared, generation));
        if make_current {
            self.shared
                .current_generation
                .store(generation, Ordering::SeqCst);
        }

        let timeout = self.settings.operation_timeout;
        let outcome = match tokio::time::timeout(timeout, client.open()).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        };

        match outcome {
            Ok(()) => Ok(ClientSlot {
                client,
                generation,
                active: true,
            }),
            Err(e) => {
                warn!(identity = %identity, error = %e, "Failed to open transport client");
                if make_current {
                    self.shared
                        .current_generation
                        .store(NO_GENERATION, Ordering::SeqCst);
                }
                close_client(identity, &client, timeout).await;
                Err(open_error(identity, e))
            }
        }
    }
}

fn open_error(identity: &Identity, error: TransportError) -> Error {
    match error {
        TransportError::Unauthorized(reason) => Error::AuthFailure {
            identity: identity.clone(),
            reason,
        },
        source => Error::TransportOpenFailure {
            identity: identity.clone(),
            source,
        },
    }
}

/// Best-effort close. Returns true if the client closed cleanly.
async fn close_client(
    identity: &Identity,
    client: &Arc<dyn TransportClient>,
    timeout: std::time::Duration,
) -> bool {
    match tokio::time::timeout(timeout, client.close()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(identity = %identity, error = %e, "Error closing transport client");
            false
        }
        Err(_) => {
            warn!(identity = %identity, "Timed out closing transport client");
            false
        }
    }
}

fn status_callback(shared: &Arc<Shared>, generation: u64) -> TransportStatusHandler {
    let weak: Weak<Shared> = Arc::downgrade(shared);
    Arc::new(move |status, reason| {
        if let Some(shared) = weak.upgrade() {
            shared.on_transport_status(generation, status, reason);
        }
    })
}

/// Near-expiry notices from the token coordinator are not gated by
/// `callbacks_enabled`.
fn near_expiry_handler(shared: &Arc<Shared>) -> StatusHandler {
    let weak: Weak<Shared> = Arc::downgrade(shared);
    Arc::new(move |change: StatusChange| {
        if let Some(shared) = weak.upgrade() {
            shared.emit(change.status, change.reason);
        }
    })
}

#[cfg(test)]
mod tests;
