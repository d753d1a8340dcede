//! Expiry Sweep
//!
//! Reads already treat stale entries as absent. Without a sweep, though, a
//! key that is never read again stays in the `app-cache` document forever,
//! and every later persist rewrites it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::SharedCache;

/// Starts the periodic sweep. The handle is aborted on shutdown.
///
/// An interval of zero is treated as one second.
pub fn spawn_cleanup_task(cache: SharedCache, interval_secs: u64) -> JoinHandle<()> {
    let period = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(period_secs = period.as_secs(), "expiry sweep running");

        let mut ticker = tokio::time::interval(period);
        // The first tick fires immediately; nothing can be stale yet
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let (purged, remaining) = {
                let mut store = cache.write().await;
                (store.purge_expired(), store.len())
            };

            if purged == 0 {
                debug!(remaining, "expiry sweep: snapshot already clean");
            } else {
                info!(purged, remaining, "expiry sweep: stale entries dropped from snapshot");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::storage::{MemoryStorage, SharedStorage, Storage, CACHE_KEY};
    use serde_json::{json, Value};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sweep_drops_stale_entries_from_snapshot() {
        let storage: SharedStorage = Arc::new(MemoryStorage::new());
        let cache = CacheStore::new(Duration::from_millis(500), storage.clone()).shared();
        cache.write().await.set("global_categories", json!([]));

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache.read().await.is_empty());
        assert_eq!(cache.read().await.stats().expirations, 1);

        let raw: Value = serde_json::from_str(&storage.read(CACHE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw["storage"], json!({}));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_keeps_fresh_entries() {
        let cache = CacheStore::in_memory(Duration::from_secs(3600)).shared();
        cache.write().await.set("global_settings", json!({"shop_name": "Sugar Loaf"}));

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let settings: Option<Value> = cache.write().await.get("global_settings");
        assert_eq!(settings, Some(json!({"shop_name": "Sugar Loaf"})));

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_stops_when_aborted() {
        let cache = CacheStore::in_memory(Duration::from_secs(60)).shared();

        let handle = spawn_cleanup_task(cache, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished());
    }
}
