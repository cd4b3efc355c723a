//! A scripted [`ConnectivityProbe`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::infrastructure::cloud::connectivity::ConnectivityProbe;

/// Pops the next scripted result on each probe (defaults to `Ok(())` when
/// exhausted). Tracks how many probes ran and the peak concurrency.
pub struct ScriptedProbe {
    results: Mutex<VecDeque<Result<()>>>,
    delay: Option<Duration>,
    count: Arc<AtomicU32>,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            delay: None,
            count: Arc::new(AtomicU32::new(0)),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
        }
    }

    pub fn with_results(self, results: Vec<Result<()>>) -> Self {
        *self.results.lock() = results.into();
        self
    }

    /// Each probe takes `delay` before returning.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue another result.
    pub fn push(&self, result: Result<()>) {
        self.results.lock().push_back(result);
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConnectivityProbe for ScriptedProbe {
    async fn probe(&self) -> Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.results.lock().pop_front().unwrap_or(Ok(()))
    }
}
