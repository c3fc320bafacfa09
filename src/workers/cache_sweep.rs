//! Drops expired queue cache entries so the in-process map stays bounded.

use crate::cache::QueueCache;

pub async fn run(cache: &dyn QueueCache) {
    match cache.purge_expired().await {
        Ok(0) => tracing::debug!("Cache sweep: nothing expired"),
        Ok(removed) => tracing::info!(removed, "Cache sweep: removed expired queue entries"),
        Err(err) => tracing::warn!(error = %err, "Cache sweep failed"),
    }
}
