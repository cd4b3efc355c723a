//! Status handlers that forward into channels.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::StatusChange;
use crate::infrastructure::cloud::StatusHandler;

/// A handler that forwards every status change into an unbounded channel.
pub fn channel_handler() -> (StatusHandler, mpsc::UnboundedReceiver<StatusChange>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: StatusHandler = Arc::new(move |change| {
        let _ = tx.send(change);
    });
    (handler, rx)
}

/// A handler that drops everything.
pub fn noop_handler() -> StatusHandler {
    Arc::new(|_| {})
}
