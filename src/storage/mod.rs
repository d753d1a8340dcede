//! Durable Storage Module
//!
//! Key-namespaced persistent documents that survive restarts. Stores mirror
//! their state here; every failure is logged and swallowed so the caller
//! keeps working from memory for the rest of the session.

mod file;
mod memory;

use std::fmt::Debug;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::StorageError;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// == Storage Keys ==
/// Cache entries and version token
pub const CACHE_KEY: &str = "app-cache";
/// Cart line items (panel flag is never persisted)
pub const CART_KEY: &str = "cart-storage";
/// Flat list of liked product ids
pub const WISHLIST_KEY: &str = "wishlist";

// == Storage Trait ==
/// A persistent string-document store addressed by key.
pub trait Storage: Send + Sync + Debug {
    /// Reads the document under `key`, `None` if it was never written.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes (replaces) the document under `key`.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Shared handle to a storage backend.
pub type SharedStorage = Arc<dyn Storage>;

// == Load ==
/// Reads and decodes the document under `key`.
///
/// Returns `None` when the document is absent, unreadable or undecodable;
/// the latter two are logged.
pub fn load<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = match storage.read(key) {
        Ok(raw) => raw?,
        Err(err) => {
            warn!(key, error = %err, "durable storage read failed");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "discarding undecodable storage document");
            None
        }
    }
}

// == Save ==
/// Encodes and writes `value` under `key`.
///
/// Returns `false` (after logging) if the write did not reach storage.
pub fn save<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) -> bool {
    let result = serde_json::to_string(value)
        .map_err(StorageError::from)
        .and_then(|json| storage.write(key, &json));

    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(key, error = %err, "durable storage write failed, keeping in-memory state");
            false
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::BrokenStorage;
    use super::*;

    #[test]
    fn test_save_then_load() {
        let storage = MemoryStorage::new();

        assert!(save(&storage, "ids", &vec![1u64, 2, 3]));
        let ids: Option<Vec<u64>> = load(&storage, "ids");
        assert_eq!(ids, Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_load_missing_key() {
        let storage = MemoryStorage::new();
        let ids: Option<Vec<u64>> = load(&storage, "ids");
        assert!(ids.is_none());
    }

    #[test]
    fn test_load_garbage_is_none() {
        let storage = MemoryStorage::new();
        storage.write("ids", "{not json").unwrap();

        let ids: Option<Vec<u64>> = load(&storage, "ids");
        assert!(ids.is_none());
    }

    #[test]
    fn test_broken_storage_is_swallowed() {
        let storage = BrokenStorage;

        assert!(!save(&storage, "ids", &vec![1u64]));
        let ids: Option<Vec<u64>> = load(&storage, "ids");
        assert!(ids.is_none());
    }
}
