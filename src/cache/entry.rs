//! Cache Entry Module
//!
//! Defines a cached remote payload together with the time it was stored.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A remote payload held by the cache, opaque to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored payload
    pub data: Value,
    /// When the payload was stored
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(data: Value) -> Self {
        Self {
            data,
            stored_at: Utc::now(),
        }
    }

    // == Age ==
    /// Milliseconds since the entry was stored. A timestamp in the future
    /// (clock moved backwards) counts as age zero.
    pub fn age_ms(&self) -> u64 {
        let elapsed = (Utc::now() - self.stored_at).num_milliseconds();
        u64::try_from(elapsed).unwrap_or(0)
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `ttl`.
    ///
    /// Boundary condition: an entry is fresh only while its age is strictly
    /// below the TTL; once the full TTL has elapsed it is expired.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        u128::from(self.age_ms()) >= ttl.as_millis()
    }
}
