//! Proactive background token refresh
//!
//! Spawns a periodic task that asks the manager to refresh the admin token
//! once it enters its buffer window, so request handlers rarely pay for a
//! live refresh. The task goes through the manager's own lock; it has no
//! separate path to the token state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::manager::AdminTokenManager;

/// Default period between refresh checks.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Spawn a background task that checks the cached token every `interval`.
///
/// A tick while the cache is empty does nothing. Failures are logged by the
/// manager and retried on the next tick; there is no backoff.
///
/// Returns a `JoinHandle` for the spawned task. Abort it on shutdown.
pub fn spawn_refresh_task(
    manager: Arc<AdminTokenManager>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "starting admin token refresh task");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the immediate first tick; startup already fetched
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let outcome = manager.refresh_if_due().await;
            debug!(?outcome, "admin token refresh tick");
        }
    })
}
