// Expiry scheduler: time-bounded lifetime for stored artifact pairs.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::store::fs_store::FsArtifactStore;
use crate::store::{ArtifactStore, StoreError};

/// Fires one best-effort purge per scheduled batch after a delay.
///
/// Tasks are detached: there is no handle to await and no way to cancel once
/// armed. Overlapping batches are not deduplicated; a second purge of the same
/// name finds nothing and moves on.
#[derive(Clone)]
pub struct ExpiryScheduler {
    store: Arc<dyn ArtifactStore>,
    delay: Duration,
}

impl ExpiryScheduler {
    pub fn new(store: Arc<dyn ArtifactStore>, delay: Duration) -> Self {
        Self { store, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Purge `names` once the configured delay has elapsed.
    pub fn schedule(&self, names: Vec<String>) {
        self.schedule_after(names, self.delay);
    }

    /// Purge `names` once `delay` has elapsed. Returns immediately.
    pub fn schedule_after(&self, names: Vec<String>, delay: Duration) {
        debug!("expiry armed in {:?} for {:?}", delay, names);
        let store = self.store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let removed = store.purge(&names).await;
            debug!("expiry fired: removed {} of {}", removed, names.len());
        });
    }
}

/// Reconcile the store with the scheduler after a restart.
///
/// Staging buffers are dropped, artifacts past their lifetime are purged and
/// the rest are re-armed for whatever lifetime they have left.
pub async fn reclaim_leftovers(
    store: &FsArtifactStore,
    scheduler: &ExpiryScheduler,
) -> Result<(), StoreError> {
    let stale_buffers = store.clear_staging()?;

    let lifetime = scheduler.delay();
    let mut expired = Vec::new();
    let mut rearmed = 0usize;
    for entry in store.entries()? {
        match lifetime.checked_sub(entry.age) {
            Some(remaining) if !remaining.is_zero() => {
                scheduler.schedule_after(vec![entry.name], remaining);
                rearmed += 1;
            }
            _ => expired.push(entry.name),
        }
    }
    let purged = store.purge(&expired).await;

    info!(
        "store reclaimed: stale_buffers={} expired={} rearmed={}",
        stale_buffers, purged, rearmed
    );
    Ok(())
}
