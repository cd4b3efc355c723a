//! Gateway-wide connectivity state machine.
//!
//! Aggregates call outcomes from every identity connection into one of three
//! states and drives health probing:
//!
//! | From         | Trigger       | To           | Side effect                     |
//! |--------------|---------------|--------------|---------------------------------|
//! | Connected    | CallTimedOut  | Trying       | probe immediately               |
//! | Connected    | CallSucceeded | Connected    | reset connected probe timer     |
//! | Trying       | CallTimedOut  | Disconnected | `DeviceDisconnected`            |
//! | Trying       | CallSucceeded | Connected    | resume connected cadence        |
//! | Disconnected | CallSucceeded | Connected    | `DeviceConnected`               |
//! | Disconnected | CallTimedOut  | Disconnected | reset disconnected probe timer  |
//!
//! Every trigger and every timer decision is evaluated under one lock, so
//! transitions never run concurrently and events are published in the order
//! transitions happen. A single background task issues probes, so probes
//! never overlap.

mod transition;


use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::Identity;
use crate::error::Result;
use crate::infrastructure::config::connectivity::ConnectivityConfig;
use crate::port::MetricsSink;

pub use transition::{fold, next_state, ConnectivityState, Trigger};

/// Link health notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    DeviceConnected,
    DeviceDisconnected,
}

/// A lightweight, side-effect-free remote call used to test the link.
///
/// Implementations must not report outcomes themselves; the state machine
/// classifies the returned result.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn probe(&self) -> Result<()>;
}

struct MachineState {
    state: ConnectivityState,
    /// When the next probe should run; `None` disables probing.
    probe_due: Option<Instant>,
    /// Set while disconnected.
    offline_since: Option<Instant>,
}

/// The single, process-wide connectivity state machine.
pub struct ConnectivityStateMachine {
    inner: Mutex<MachineState>,
    events: broadcast::Sender<ConnectivityEvent>,
    timer: Notify,
    config: ConnectivityConfig,
    identity: Identity,
    metrics: Arc<dyn MetricsSink>,
}

impl ConnectivityStateMachine {
    /// Create a machine that starts `Connected` with the connected timer armed.
    ///
    /// `identity` is the key metrics are recorded under (the gateway's own).
    pub fn new(
        config: ConnectivityConfig,
        identity: Identity,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self::with_initial_state(config, identity, metrics, ConnectivityState::Connected)
    }

    /// Create a machine in a specific state.
    pub fn with_initial_state(
        config: ConnectivityConfig,
        identity: Identity,
        metrics: Arc<dyn MetricsSink>,
        initial: ConnectivityState,
    ) -> Self {
        let now = Instant::now();
        let (probe_due, offline_since) = match initial {
            ConnectivityState::Connected => (Some(now + config.connected_interval()), None),
            ConnectivityState::Trying => (Some(now), None),
            ConnectivityState::Disconnected => {
                (Some(now + config.disconnected_interval()), Some(now))
            }
        };
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            inner: Mutex::new(MachineState {
                state: initial,
                probe_due,
                offline_since,
            }),
            events,
            timer: Notify::new(),
            config,
            identity,
            metrics,
        }
    }

    /// Current state. Diagnostic only; components react to events instead.
    #[must_use]
    pub fn state(&self) -> ConnectivityState {
        self.inner.lock().state
    }

    /// Subscribe to `DeviceConnected` / `DeviceDisconnected` events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// A call succeeded somewhere on the link.
    pub fn call_succeeded(&self) {
        self.report(Trigger::CallSucceeded);
    }

    /// A call failed in a timeout-shaped way.
    pub fn call_timed_out(&self) {
        self.report(Trigger::CallTimedOut);
    }

    /// Evaluate one trigger.
    pub fn report(&self, trigger: Trigger) {
        use ConnectivityState::{Connected, Disconnected, Trying};

        let mut inner = self.inner.lock();
        let from = inner.state;
        let to = next_state(from, trigger);
        inner.state = to;
        let now = Instant::now();

        match (from, to) {
            (Connected, Connected) => {
                inner.probe_due = Some(now + self.config.connected_interval());
            }
            (Disconnected, Disconnected) => {
                inner.probe_due = Some(now + self.config.disconnected_interval());
            }
            (Connected, Trying) => {
                debug!("Call timed out while connected, probing");
                inner.probe_due = Some(now);
            }
            (Trying, Connected) => {
                debug!("Probe resolved, still connected");
                inner.probe_due = Some(now + self.config.connected_interval());
            }
            (Trying, Disconnected) => {
                warn!(identity = %self.identity, "Cloud connectivity lost");
                inner.offline_since = Some(now);
                inner.probe_due = Some(now + self.config.disconnected_interval());
                self.metrics.record_offline(&self.identity);
                self.publish(ConnectivityEvent::DeviceDisconnected);
            }
            (Disconnected, Connected) => {
                let offline_for = inner
                    .offline_since
                    .take()
                    .map_or(Duration::ZERO, |since| now.saturating_duration_since(since));
                info!(
                    identity = %self.identity,
                    offline_secs = offline_for.as_secs(),
                    "Cloud connectivity restored"
                );
                inner.probe_due = Some(now + self.config.connected_interval());
                self.metrics
                    .record_offline_duration(&self.identity, offline_for);
                self.publish(ConnectivityEvent::DeviceConnected);
            }
            (Trying, Trying)
            | (Connected, Disconnected)
            | (Disconnected, Trying) => {
                debug_assert!(false, "impossible transition {from} -> {to}");
            }
        }
        drop(inner);

        self.timer.notify_one();
    }

    /// Spawn the probe timer task.
    ///
    /// The task runs until aborted; the returned handle owns it.
    pub fn start(self: &Arc<Self>, probe: Arc<dyn ConnectivityProbe>) -> JoinHandle<()> {
        let machine = Arc::clone(self);
        tokio::spawn(async move { machine.run_probes(probe).await })
    }

    async fn run_probes(&self, probe: Arc<dyn ConnectivityProbe>) {
        debug!("Connectivity probe task started");
        loop {
            let due = self.inner.lock().probe_due;
            let Some(at) = due else {
                self.timer.notified().await;
                continue;
            };

            if at > Instant::now() {
                tokio::select! {
                    () = tokio::time::sleep_until(at) => {}
                    () = self.timer.notified() => continue,
                }
            }

            if self.claim_probe(at) {
                self.probe_once(probe.as_ref()).await;
            }
        }
    }

    /// Re-arm the timer for the current state if `at` is still the deadline.
    fn claim_probe(&self, at: Instant) -> bool {
        let mut inner = self.inner.lock();
        if inner.probe_due != Some(at) {
            return false;
        }
        let interval = match inner.state {
            ConnectivityState::Connected => self.config.connected_interval(),
            ConnectivityState::Trying | ConnectivityState::Disconnected => {
                self.config.disconnected_interval()
            }
        };
        inner.probe_due = Some(Instant::now() + interval);
        true
    }

    async fn probe_once(&self, probe: &dyn ConnectivityProbe) {
        match probe.probe().await {
            Ok(()) => {
                debug!("Connectivity probe succeeded");
                self.report(Trigger::CallSucceeded);
            }
            Err(e) if e.is_timeout_shaped() => {
                debug!(error = %e, "Connectivity probe timed out");
                self.report(Trigger::CallTimedOut);
            }
            Err(e) => {
                // Not a link signal; may hide real failures.
                warn!(error = %e, "Connectivity probe failed");
            }
        }
    }

    fn publish(&self, event: ConnectivityEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
