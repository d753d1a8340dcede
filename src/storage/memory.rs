//! In-memory storage backend, used for tests and as the fallback when the
//! storage directory cannot be created.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StorageError;
use crate::storage::Storage;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    documents: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let documents = self.documents.lock().map_err(|_| StorageError::Unavailable)?;
        Ok(documents.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut documents = self.documents.lock().map_err(|_| StorageError::Unavailable)?;
        documents.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
