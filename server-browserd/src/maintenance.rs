use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use crate::registry::ServerRegistry;

/// Periodically evicts timed out servers, so memory is reclaimed even when
/// nobody is listing.
pub async fn run(registry: Arc<ServerRegistry>, interval: Duration, cancel: CancellationToken) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                let evicted = registry.evict_expired(Utc::now());
                if evicted > 0 {
                    tracing::info!("Swept {} timed out servers, {} remaining", evicted, registry.len());
                }
            }
            _ = cancel.cancelled() => {
                tracing::info!("Registry sweeper shutting down");
                break;
            }
        }
    }
}
