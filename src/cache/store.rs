//! Cache Store Module
//!
//! Versioned key-value cache with TTL expiration, mirrored to durable storage
//! on every mutation so a restart within the TTL reuses remote reads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats};
use crate::storage::{self, MemoryStorage, SharedStorage, CACHE_KEY};

/// Cache store shared between fetch services, the invalidation observer and
/// the sweep task.
pub type SharedCache = Arc<RwLock<CacheStore>>;

/// Version in effect until the remote source announces one.
pub const INITIAL_VERSION: u64 = 0;

// == Durable Snapshot ==
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    storage: HashMap<String, CacheEntry>,
    #[serde(default)]
    version: u64,
    #[serde(default)]
    announced: Option<u64>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    storage: &'a HashMap<String, CacheEntry>,
    version: u64,
    announced: Option<u64>,
}

// == Cache Store ==
/// Expiring cache of remote reads.
///
/// A version change wipes every entry; there is no per-entry versioning.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Cache-busting version token
    version: u64,
    /// Last version announced by the remote source
    announced: Option<u64>,
    /// Bumped on every wipe or invalidation; lets in-flight reads detect
    /// that their result predates it
    generation: u64,
    /// Maximum age of a usable entry
    ttl: Duration,
    /// Performance statistics
    stats: CacheStats,
    /// Durable mirror
    storage: SharedStorage,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store, restoring entries and version from `storage`.
    ///
    /// Entries already past their TTL are dropped during restore. An
    /// unreadable snapshot starts the store empty at the initial version.
    pub fn new(ttl: Duration, storage: SharedStorage) -> Self {
        let snapshot: Snapshot = storage::load(storage.as_ref(), CACHE_KEY).unwrap_or_default();

        let mut entries = snapshot.storage;
        entries.retain(|_, entry| !entry.is_expired(ttl));
        if !entries.is_empty() {
            info!(
                restored = entries.len(),
                version = snapshot.version,
                "restored cache entries from durable storage"
            );
        }

        Self {
            entries,
            version: snapshot.version,
            announced: snapshot.announced,
            generation: 0,
            ttl,
            stats: CacheStats::new(),
            storage,
        }
    }

    /// Creates a store without a durable mirror.
    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(MemoryStorage::new()))
    }

    /// Wraps the store for sharing across tasks.
    pub fn shared(self) -> SharedCache {
        Arc::new(RwLock::new(self))
    }

    // == Set Version ==
    /// Records the remote cache-busting version.
    ///
    /// A version different from the current one wipes every entry. Returns
    /// `true` when a wipe happened.
    pub fn set_version(&mut self, version: u64) -> bool {
        if version == self.version {
            return false;
        }

        let dropped = self.entries.len();
        self.entries.clear();
        self.version = version;
        self.generation += 1;
        self.persist();

        info!(version, dropped, "cache version changed, entries wiped");
        true
    }

    /// Applies a version announced by the remote source.
    ///
    /// Only a change of the announced value wipes the cache, so a local
    /// invalidation followed by the same announcement keeps entries fetched
    /// in between. Returns `true` when a wipe happened.
    pub fn apply_remote_version(&mut self, version: u64) -> bool {
        if self.announced == Some(version) {
            return false;
        }

        self.announced = Some(version);
        let wiped = self.set_version(version);
        if !wiped {
            self.persist();
        }
        wiped
    }

    // == Set ==
    /// Stores `data` under `key`, stamped now. Overwrites any previous entry.
    pub fn set(&mut self, key: impl Into<String>, data: Value) {
        let key = key.into();
        debug!(key = %key, "cache set");
        self.entries.insert(key, CacheEntry::new(data));
        self.persist();
    }

    // == Get ==
    /// Returns the fresh payload under `key` decoded as `T`.
    ///
    /// A missing, expired or undecodable entry is a miss; expired entries are
    /// evicted as a side effect.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let Some(entry) = self.entries.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if entry.is_expired(self.ttl) {
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            self.persist();
            debug!(key, "cache entry expired");
            return None;
        }

        match serde_json::from_value(entry.data.clone()) {
            Ok(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Err(_) => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Invalidate ==
    /// Removes one entry, or with `None` wipes everything and bumps the
    /// version to a fresh token.
    pub fn invalidate(&mut self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.generation += 1;
                if self.entries.remove(key).is_some() {
                    debug!(key, "cache entry invalidated");
                    self.persist();
                }
            }
            None => {
                let dropped = self.entries.len();
                self.entries.clear();
                self.version = fresh_version(self.version);
                self.generation += 1;
                self.stats.record_invalidation();
                self.persist();
                info!(version = self.version, dropped, "cache globally invalidated");
            }
        }
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn purge_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(ttl));

        let removed = before - self.entries.len();
        if removed > 0 {
            self.stats.record_expirations(removed);
            self.persist();
        }
        removed
    }

    // == Accessors ==
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Changes whenever entries are invalidated or wiped by a version change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a fresh entry exists under `key`, without touching stats.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(self.ttl))
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.version = self.version;
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) {
        let snapshot = SnapshotRef {
            storage: &self.entries,
            version: self.version,
            announced: self.announced,
        };
        storage::save(self.storage.as_ref(), CACHE_KEY, &snapshot);
    }
}

/// A version token distinct from `current`, derived from the clock.
fn fresh_version(current: u64) -> u64 {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
    now.max(current.saturating_add(1))
}
