use super::RefreshCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Keep the cache warm by asking for freshness on a fixed interval.
///
/// Requests that arrive between ticks are still served by the on-demand
/// path; a tick that lands on fresh data or an in-flight round does not
/// start extra probes. Returns immediately when `every` is zero.
pub async fn run_background_refresh(
    coordinator: Arc<RefreshCoordinator>,
    every: Duration,
    max_age: Duration,
) {
    if every.is_zero() {
        info!("Background refresh disabled");
        return;
    }

    info!(
        interval_ms = every.as_millis() as u64,
        max_age_ms = max_age.as_millis() as u64,
        "Starting background refresh"
    );

    let mut ticker = interval(every);

    // Skip missed ticks so a slow round does not queue up a burst
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        if let Err(e) = coordinator.ensure_fresh(max_age).await {
            warn!(error = %e, "Background refresh failed");
        }
    }
}
