//! Wishlist Synchronization
//!
//! The liked-products set lives only in durable storage as a flat id list.
//! Consumers read it directly and re-derive their view whenever a
//! `WishlistUpdated` event arrives; each toggle publishes exactly one event.

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::cart::ProductId;
use crate::error::{StorageError, Result};
use crate::events::{EventBus, StoreEvent};
use crate::services::{Product, ProductService};
use crate::storage::{self, SharedStorage, WISHLIST_KEY};

// == Wishlist ==
#[derive(Debug)]
pub struct Wishlist {
    storage: SharedStorage,
    events: EventBus,
    /// Last list written this session. Read only when storage cannot be;
    /// the lock also serializes read-modify-write toggles.
    session: Mutex<Vec<ProductId>>,
}

impl Wishlist {
    pub fn new(storage: SharedStorage, events: EventBus) -> Self {
        let initial = storage::load(storage.as_ref(), WISHLIST_KEY).unwrap_or_default();
        Self {
            storage,
            events,
            session: Mutex::new(initial),
        }
    }

    // == Toggle ==
    /// Flips membership of `id` and broadcasts once. Returns whether the
    /// product is liked afterwards.
    pub fn toggle(&self, id: ProductId) -> bool {
        let liked = {
            let mut session = self.lock_session();
            let mut ids = self.read_with(&session);

            let liked = match ids.iter().position(|existing| *existing == id) {
                Some(index) => {
                    ids.remove(index);
                    false
                }
                None => {
                    ids.push(id);
                    true
                }
            };

            storage::save(self.storage.as_ref(), WISHLIST_KEY, &ids);
            *session = ids;
            liked
        };

        debug!(id, liked, "wishlist toggled");
        self.events.publish(StoreEvent::WishlistUpdated);
        liked
    }

    // == Queries ==
    /// Current liked ids, in the order they were liked.
    pub fn ids(&self) -> Vec<ProductId> {
        let session = self.lock_session();
        self.read_with(&session)
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.ids().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    // == Hydrate ==
    /// Full product records for every liked id that is still in the catalog.
    ///
    /// Reuses the cached product collection; only ids are ever persisted, so
    /// the result reflects the catalog as of its last fetch.
    pub async fn hydrate(&self, products: &ProductService) -> Result<Vec<Product>> {
        let ids = self.ids();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let catalog = products.all().await?;
        Ok(catalog
            .into_iter()
            .filter(|product| ids.contains(&product.id))
            .collect())
    }

    fn read_with(&self, session: &[ProductId]) -> Vec<ProductId> {
        match self.read_storage() {
            Ok(Some(ids)) => ids,
            Ok(None) => Vec::new(),
            Err(err) => {
                debug!(error = %err, "wishlist storage unreadable, using session copy");
                session.to_vec()
            }
        }
    }

    fn read_storage(&self) -> std::result::Result<Option<Vec<ProductId>>, StorageError> {
        match self.storage.read(WISHLIST_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Vec<ProductId>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
