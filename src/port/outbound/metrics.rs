//! Metrics port for connectivity observations.

use std::time::Duration;

use crate::domain::Identity;

/// Sink for offline counters and durations, keyed by identity.
pub trait MetricsSink: Send + Sync {
    /// The link went offline.
    fn record_offline(&self, identity: &Identity);

    /// The link came back after being offline for `duration`.
    fn record_offline_duration(&self, identity: &Identity, duration: Duration);
}
