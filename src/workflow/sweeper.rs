//! Expiration sweeper: periodic scan that expires overdue confirmations and
//! triggers reassignment.

use std::sync::Arc;
use std::time::Duration;

use super::engine::ConfirmationWorkflow;

/// Spawn the background sweep loop. Each tick is idempotent: records already
/// moved to a terminal state by a concurrent worker reply are left alone.
pub fn spawn_sweep_task(
    workflow: Arc<ConfirmationWorkflow>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            workflow.sweep_once().await;
        }
    })
}
