//! Idle management task.

use std::time::Duration;

use tracing::debug;

use super::ManagerRef;

/// Periodically close connections unused for longer than `idle_timeout`.
///
/// Closures run concurrently via `join_all` so one slow close does not delay
/// the rest of the sweep.
pub(super) async fn idle_task(
    manager: ManagerRef,
    check_interval: Duration,
    idle_timeout: Duration,
) {
    let mut interval = tokio::time::interval(check_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    debug!(
        check_secs = check_interval.as_secs(),
        idle_secs = idle_timeout.as_secs(),
        "Idle management task started"
    );

    loop {
        interval.tick().await;
        let Some(manager) = manager.upgrade() else {
            break;
        };

        // Phase 1: pick candidates without holding any slot lock.
        let idle = manager.idle_identities(idle_timeout);
        if idle.is_empty() {
            continue;
        }

        // Phase 2: re-check and close under each identity's lock.
        let closes: Vec<_> = idle
            .iter()
            .map(|identity| manager.close_if_idle(identity, idle_timeout))
            .collect();
        futures_util::future::join_all(closes).await;
    }
}
