//! Mock transport clients for testing.
//!
//! - [`MockTransport`]: a client with scripted open and call results and
//!   shared counters. The registered status handler is captured so tests can
//!   emit link status changes with [`MockTransport::emit`].
//!
//! - [`MockTransportProvider`]: hands out `MockTransport`s built from queued
//!   [`MockScript`]s and keeps every client it created for inspection.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::message::empty_metadata;
use crate::domain::{ChangeReason, ConnectionStatus, Message, Metadata};
use crate::error::TransportError;
use crate::port::{
    AuthMethod, TransportClient, TransportProvider, TransportSettings, TransportStatusHandler,
};

type CallResult = Result<(), TransportError>;

// ---------------------------------------------------------------------------
// MockScript
// ---------------------------------------------------------------------------

/// Scripted behavior for the next client a provider creates.
#[derive(Debug, Clone, Default)]
pub struct MockScript {
    pub open_results: Vec<CallResult>,
    pub call_results: Vec<CallResult>,
    /// `open()` never completes.
    pub hang_on_open: bool,
    /// `create()` itself fails.
    pub create_error: Option<TransportError>,
}

impl MockScript {
    pub fn open_fails(error: TransportError) -> Self {
        Self {
            open_results: vec![Err(error)],
            ..Self::default()
        }
    }

    pub fn hanging_open() -> Self {
        Self {
            hang_on_open: true,
            ..Self::default()
        }
    }

    pub fn with_call_results(mut self, results: Vec<CallResult>) -> Self {
        self.call_results = results;
        self
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// A mock transport client.
///
/// `open()` and the three remote calls pop the next result from their queues
/// (defaulting to `Ok` when exhausted).
pub struct MockTransport {
    auth: AuthMethod,
    open_results: Mutex<VecDeque<CallResult>>,
    call_results: Mutex<VecDeque<CallResult>>,
    hang_on_open: bool,
    active: AtomicBool,
    handler: Mutex<Option<TransportStatusHandler>>,
    open_count: AtomicU32,
    close_count: AtomicU32,
    call_count: AtomicU32,
    handler_count: AtomicU32,
    updates: Mutex<Vec<Metadata>>,
    sent: Mutex<Vec<Message>>,
}

impl MockTransport {
    pub fn new(auth: AuthMethod, script: MockScript) -> Self {
        Self {
            auth,
            open_results: Mutex::new(script.open_results.into()),
            call_results: Mutex::new(script.call_results.into()),
            hang_on_open: script.hang_on_open,
            active: AtomicBool::new(false),
            handler: Mutex::new(None),
            open_count: AtomicU32::new(0),
            close_count: AtomicU32::new(0),
            call_count: AtomicU32::new(0),
            handler_count: AtomicU32::new(0),
            updates: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn auth(&self) -> &AuthMethod {
        &self.auth
    }

    /// Queue results for subsequent remote calls.
    pub fn push_call_results(&self, results: Vec<CallResult>) {
        self.call_results.lock().extend(results);
    }

    /// Invoke the registered status handler, as a real client would.
    ///
    /// A non-retrying disconnect also drops the client's own active flag.
    pub fn emit(&self, status: ConnectionStatus, reason: ChangeReason) {
        if matches!(
            status,
            ConnectionStatus::Disconnected | ConnectionStatus::Disabled
        ) {
            self.active.store(false, Ordering::SeqCst);
        }
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(status, reason);
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> u32 {
        self.open_count.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> u32 {
        self.close_count.load(Ordering::SeqCst)
    }

    /// Number of `send`, `get_metadata`, and `update_metadata` calls.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Number of `set_status_handler` calls.
    pub fn handler_count(&self) -> u32 {
        self.handler_count.load(Ordering::SeqCst)
    }

    /// Metadata patches applied through `update_metadata`.
    pub fn updates(&self) -> Vec<Metadata> {
        self.updates.lock().clone()
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    fn next_call(&self) -> CallResult {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.call_results.lock().pop_front().unwrap_or(Ok(()))
    }
}

#[async_trait]
impl TransportClient for MockTransport {
    async fn open(&self) -> Result<(), TransportError> {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        if self.hang_on_open {
            return std::future::pending().await;
        }
        let result = self.open_results.lock().pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.active.store(true, Ordering::SeqCst);
        }
        result
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, message: Message) -> Result<(), TransportError> {
        self.next_call()?;
        self.sent.lock().push(message);
        Ok(())
    }

    async fn get_metadata(&self) -> Result<Metadata, TransportError> {
        self.next_call()?;
        Ok(empty_metadata())
    }

    async fn update_metadata(&self, patch: Metadata) -> Result<(), TransportError> {
        self.next_call()?;
        self.updates.lock().push(patch);
        Ok(())
    }

    fn set_status_handler(&self, handler: TransportStatusHandler) {
        self.handler_count.fetch_add(1, Ordering::SeqCst);
        *self.handler.lock() = Some(handler);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// MockTransportProvider
// ---------------------------------------------------------------------------

/// Creates [`MockTransport`]s from queued scripts (default script when the
/// queue is empty).
#[derive(Default)]
pub struct MockTransportProvider {
    scripts: Mutex<VecDeque<MockScript>>,
    created: Mutex<Vec<Arc<MockTransport>>>,
    settings: Mutex<Option<TransportSettings>>,
}

impl MockTransportProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next client this provider creates.
    pub fn push(&self, script: MockScript) {
        self.scripts.lock().push_back(script);
    }

    /// Every client created so far, oldest first.
    pub fn created(&self) -> Vec<Arc<MockTransport>> {
        self.created.lock().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// The most recently created client.
    pub fn last(&self) -> Option<Arc<MockTransport>> {
        self.created.lock().last().cloned()
    }

    /// Settings passed to the most recent `create()`.
    pub fn last_settings(&self) -> Option<TransportSettings> {
        self.settings.lock().clone()
    }
}

impl TransportProvider for MockTransportProvider {
    fn create(
        &self,
        auth: AuthMethod,
        settings: &TransportSettings,
    ) -> Result<Arc<dyn TransportClient>, TransportError> {
        let script = self.scripts.lock().pop_front().unwrap_or_default();
        *self.settings.lock() = Some(settings.clone());
        if let Some(error) = script.create_error.clone() {
            return Err(error);
        }

        let client = Arc::new(MockTransport::new(auth, script));
        self.created.lock().push(Arc::clone(&client));
        Ok(client)
    }
}
