//! Monitoring and observability data types.
//!
//! [`InMemoryMetrics`] keeps offline counters per identity so diagnostics and
//! tests can inspect them without a metrics backend.

use std::time::Duration;

use dashmap::DashMap;

use crate::domain::Identity;
use crate::port::MetricsSink;

/// Offline statistics for one identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfflineStats {
    /// Number of times the link went offline.
    pub offline_count: u64,
    /// Total time spent offline across completed outages.
    pub total_offline: Duration,
    /// Duration of the most recent completed outage.
    pub last_offline: Option<Duration>,
    /// Number of completed outages.
    pub recoveries: u64,
}

/// Metrics sink that accumulates in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    stats: DashMap<Identity, OfflineStats>,
}

impl InMemoryMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stats recorded for `identity`.
    #[must_use]
    pub fn stats(&self, identity: &Identity) -> OfflineStats {
        self.stats
            .get(identity)
            .map(|s| s.value().clone())
            .unwrap_or_default()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record_offline(&self, identity: &Identity) {
        self.stats.entry(identity.clone()).or_default().offline_count += 1;
    }

    fn record_offline_duration(&self, identity: &Identity, duration: Duration) {
        let mut entry = self.stats.entry(identity.clone()).or_default();
        entry.total_offline += duration;
        entry.last_offline = Some(duration);
        entry.recoveries += 1;
    }
}
