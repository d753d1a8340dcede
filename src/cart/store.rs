//! Cart Aggregate Store
//!
//! Quantity-keyed collection of pending order lines. Per product the line
//! moves absent -> 1 -> N -> absent; it is never stored at quantity zero.
//! Only the lines are persisted, the panel flag lives for the session.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cart::{CartItem, ProductId, ProductRef};
use crate::events::{EventBus, StoreEvent};
use crate::storage::{self, SharedStorage, CART_KEY};

/// Cart store shared between handlers.
pub type SharedCart = Arc<RwLock<CartStore>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedCart {
    #[serde(default)]
    items: Vec<CartItem>,
}

// == Cart Store ==
#[derive(Debug)]
pub struct CartStore {
    items: Vec<CartItem>,
    panel_open: bool,
    storage: SharedStorage,
    events: EventBus,
}

impl CartStore {
    // == Constructor ==
    /// Restores the persisted lines; the panel always starts closed.
    pub fn new(storage: SharedStorage, events: EventBus) -> Self {
        let persisted: PersistedCart = storage::load(storage.as_ref(), CART_KEY).unwrap_or_default();

        let mut items: Vec<CartItem> = Vec::with_capacity(persisted.items.len());
        for item in persisted.items {
            if item.quantity == 0 || items.iter().any(|existing| existing.id == item.id) {
                continue;
            }
            items.push(item);
        }
        if !items.is_empty() {
            info!(lines = items.len(), "restored cart from durable storage");
        }

        Self {
            items,
            panel_open: false,
            storage,
            events,
        }
    }

    pub fn shared(self) -> SharedCart {
        Arc::new(RwLock::new(self))
    }

    // == Add Item ==
    /// Adds one unit of `product`.
    ///
    /// An existing line is incremented; a new line is inserted at quantity 1
    /// and opens the panel. Returns the line's new quantity.
    pub fn add_item(&mut self, product: ProductRef) -> u32 {
        let quantity = match self.items.iter_mut().find(|item| item.id == product.id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(1);
                item.quantity
            }
            None => {
                self.items.push(CartItem::from_product(product));
                self.panel_open = true;
                1
            }
        };

        self.commit();
        quantity
    }

    // == Remove Item ==
    /// Removes one unit of product `id`; the last unit removes the line.
    ///
    /// Returns the remaining quantity, `None` if the line is gone or never
    /// existed. An absent id is a no-op.
    pub fn remove_item(&mut self, id: ProductId) -> Option<u32> {
        let index = self.items.iter().position(|item| item.id == id)?;

        let remaining = if self.items[index].quantity > 1 {
            self.items[index].quantity -= 1;
            Some(self.items[index].quantity)
        } else {
            self.items.remove(index);
            None
        };

        self.commit();
        remaining
    }

    // == Remove Full Item ==
    /// Drops the whole line for `id` regardless of quantity.
    pub fn remove_full_item(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);

        let removed = self.items.len() != before;
        if removed {
            self.commit();
        }
        removed
    }

    // == Clear ==
    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.commit();
    }

    // == Panel ==
    pub fn toggle_panel(&mut self) -> bool {
        self.panel_open = !self.panel_open;
        self.panel_open
    }

    pub fn set_panel(&mut self, open: bool) {
        self.panel_open = open;
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    // == Queries ==
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn quantity_of(&self, id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| item.id == id)
            .map_or(0, |item| item.quantity)
    }

    /// Sum of quantities across lines.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn commit(&self) {
        debug!(lines = self.items.len(), "cart changed");
        storage::save(
            self.storage.as_ref(),
            CART_KEY,
            &PersistedCartRef { items: &self.items },
        );
        self.events.publish(StoreEvent::CartUpdated);
    }
}

#[derive(Serialize)]
struct PersistedCartRef<'a> {
    items: &'a [CartItem],
}
