//! Background session expiry.

use rx_intake::IntakeApi;
use rx_telemetry::metrics::ACTIVE_SESSIONS;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default purge interval.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Purge idle sessions every `interval`. Runs until the task is dropped.
pub async fn cleanup_task(intake: Arc<dyn IntakeApi>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let removed = intake.purge_idle_sessions();
        if removed > 0 {
            debug!(removed = removed, "[rx-gateway] cleaned up idle sessions");
        }
        ACTIVE_SESSIONS.set(intake.active_sessions() as f64);
    }
}
