//! Periodic background sweep (spec §4.7).
//!
//! Two sweeps on one interval: evict disconnected shoppers past the
//! grace window, and evict `pending` collaboration sessions past their
//! request TTL. Either sweep that removes anything triggers one
//! broadcast, reflecting the spec's "every state change is followed by
//! at least one broadcast" ordering guarantee (spec §5).

use tokio::time::interval;
use tracing::info;

use crate::queue_service;
use crate::state::AppState;

/// Guard that aborts the spawned janitor task when dropped, so the
/// sweep loop never outlives the server it was started for.
pub struct JanitorHandle(tokio::task::JoinHandle<()>);

impl Drop for JanitorHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Spawn the janitor loop on `state.config`'s interval, grace window, and
/// collaboration TTL.
#[must_use]
pub fn spawn(state: AppState) -> JanitorHandle {
    let config = state.config.clone();
    let store = state.store.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = interval(config.janitor_interval);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now();

            let evicted_shoppers = store.evict_stale_disconnected(now, config.disconnect_grace);
            let evicted_collab = store.evict_expired_collab(now, config.collab_request_ttl);

            if !evicted_shoppers.is_empty() {
                info!(count = evicted_shoppers.len(), "janitor evicted stale shoppers");
            }
            if !evicted_collab.is_empty() {
                info!(count = evicted_collab.len(), "janitor evicted expired collaboration requests");
            }

            if !evicted_shoppers.is_empty() || !evicted_collab.is_empty() {
                queue_service::publish_queue_update(&store, now);
            }
        }
    });

    JanitorHandle(handle)
}
