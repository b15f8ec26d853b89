//! Reconnect supervision for feed adapters.
//!
//! Every adapter runs under [`supervise`]: one connection attempt after
//! another, separated by a fixed backoff, until the shutdown signal
//! flips. All venue-specific behavior stays inside the adapter; the
//! supervisor only restarts it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::adapter::FeedAdapter;

/// Delay between reconnection attempts. Fixed, no escalation: venues
/// rate-limit dials far above one per three seconds, and a flat delay
/// keeps worst-case staleness bounded.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Run one adapter until shutdown.
///
/// Any error from `connect` is logged with the adapter name and retried
/// after [`RECONNECT_DELAY`]. Shutdown is observed during the connection
/// and during the backoff sleep; in both cases the task returns
/// promptly.
pub async fn supervise(adapter: Arc<dyn FeedAdapter>, mut shutdown: watch::Receiver<bool>) {
    let name = adapter.name();
    info!(adapter = name, "starting");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let connect_shutdown = shutdown.clone();
        let result = tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            result = adapter.connect(connect_shutdown) => result,
        };

        match result {
            Ok(()) => {
                // Adapters return Ok only on shutdown.
                if *shutdown.borrow() {
                    break;
                }
                warn!(adapter = name, "connection ended without error, reconnecting");
            }
            Err(e) => {
                warn!(
                    adapter = name,
                    error = %e,
                    delay_secs = RECONNECT_DELAY.as_secs(),
                    "disconnected, reconnecting"
                );
            }
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = sleep(RECONNECT_DELAY) => {}
        }
    }

    info!(adapter = name, "stopped");
}
