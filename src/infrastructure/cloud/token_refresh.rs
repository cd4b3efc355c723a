//! Token refresh coordination for one identity.
//!
//! The transport's authentication layer asks for a token whenever it needs to
//! mint or renew one. If the current token still has more than the expiry
//! buffer left it is returned at once. Otherwise a single
//! [`PendingTokenRequest`] is opened for the identity, observers are told the
//! token is near expiry, and every caller suspends until some external
//! supplier delivers a replacement.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::token;
use crate::domain::{ChangeReason, CloudConnectionStatus, Identity, StatusChange};
use crate::error::Result;
use crate::infrastructure::config::token::TokenConfig;
use crate::port::TokenSource;

use super::StatusHandler;

/// A single outstanding "please give me a new token" handle.
///
/// Cloning shares the same request. It is fulfilled at most once.
#[derive(Clone)]
struct PendingTokenRequest {
    id: u64,
    tx: Arc<watch::Sender<Option<String>>>,
}

impl PendingTokenRequest {
    fn new(id: u64) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            id,
            tx: Arc::new(tx),
        }
    }

    /// Complete the request. Returns false if it was already completed.
    fn fulfill(&self, token: &str) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(token.to_string());
            true
        })
    }

    async fn wait(&self) -> String {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let token = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone().unwrap_or_default(),
            Err(_) => String::new(),
        };
        token
    }
}

/// Supplies an always-usable token for one identity.
pub struct TokenRefreshCoordinator {
    identity: Identity,
    current: Mutex<String>,
    pending: Mutex<Option<PendingTokenRequest>>,
    next_request_id: AtomicU64,
    status_handler: StatusHandler,
    buffer: Duration,
    retry_delay: Duration,
}

impl TokenRefreshCoordinator {
    /// Create a coordinator seeded with `initial_token`.
    pub fn new(
        identity: Identity,
        initial_token: impl Into<String>,
        config: &TokenConfig,
        status_handler: StatusHandler,
    ) -> Self {
        Self {
            identity,
            current: Mutex::new(initial_token.into()),
            pending: Mutex::new(None),
            next_request_id: AtomicU64::new(1),
            status_handler,
            buffer: config.expiry_buffer(),
            retry_delay: config.retry_delay(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The most recent usable token this coordinator has seen.
    #[must_use]
    pub fn current_token(&self) -> String {
        self.current.lock().clone()
    }

    /// Whether a caller is currently waiting for a new token.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Return `current` if it has more than the buffer left; otherwise wait
    /// for a fresh token.
    ///
    /// Retries indefinitely: if a delivered token is itself stale, a new
    /// request is opened after the retry delay.
    pub async fn get_token(&self, current: &str) -> String {
        if token::is_usable(current, self.buffer) {
            return current.to_string();
        }

        loop {
            let request = self.join_or_open_request();
            let delivered = request.wait().await;
            self.clear_request(request.id);

            if token::is_usable(&delivered, self.buffer) {
                debug!(identity = %self.identity, "Received fresh token");
                *self.current.lock() = delivered.clone();
                return delivered;
            }

            warn!(
                identity = %self.identity,
                retry_in_secs = self.retry_delay.as_secs(),
                "Delivered token is not usable, requesting another"
            );
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// Replace the current token and complete any outstanding request with it.
    ///
    /// Returns true when a waiting request was completed.
    pub fn replace_token(&self, token: &str) -> bool {
        *self.current.lock() = token.to_string();
        self.deliver(token)
    }

    /// Hand `token` to the outstanding request, if there is one.
    ///
    /// Returns true when a waiting request was completed.
    pub fn deliver(&self, token: &str) -> bool {
        match self.pending.lock().as_ref() {
            Some(request) => request.fulfill(token),
            None => false,
        }
    }

    fn join_or_open_request(&self) -> PendingTokenRequest {
        let opened = {
            let mut slot = self.pending.lock();
            if let Some(existing) = slot.as_ref() {
                return existing.clone();
            }
            let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
            let request = PendingTokenRequest::new(id);
            *slot = Some(request.clone());
            request
        };

        info!(identity = %self.identity, "Token near expiry, requesting a new one");
        (self.status_handler)(StatusChange {
            identity: self.identity.clone(),
            status: CloudConnectionStatus::TokenNearExpiry,
            reason: ChangeReason::TokenNearExpiry,
        });
        opened
    }

    fn clear_request(&self, id: u64) {
        let mut slot = self.pending.lock();
        if slot.as_ref().is_some_and(|r| r.id == id) {
            *slot = None;
        }
    }
}

#[async_trait]
impl TokenSource for TokenRefreshCoordinator {
    async fn token(&self) -> Result<String> {
        let current = self.current_token();
        Ok(self.get_token(&current).await)
    }
}
