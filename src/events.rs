//! Broadcast Channel
//!
//! In-process publish/subscribe used to keep independently mounted consumers
//! consistent. Each logical mutation publishes exactly one event, however many
//! subscribers are listening.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::cart::ProductId;

// == Store Event ==
/// Notifications emitted by the stores and services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// The liked-products list changed
    WishlistUpdated,
    /// Cart lines changed
    CartUpdated,
    /// Shop settings were written by an admin
    SettingsUpdated,
    /// A product detail was loaded (breadcrumb contract)
    ProductLoaded {
        id: ProductId,
        name: String,
        category_id: Option<u64>,
    },
}

// == Event Bus ==
/// Cloneable handle to the broadcast channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes one event to every current subscriber.
    ///
    /// Returns the number of subscribers reached; publishing with nobody
    /// listening is not an error.
    pub fn publish(&self, event: StoreEvent) -> usize {
        let reached = self.sender.send(event.clone()).unwrap_or(0);
        debug!(?event, reached, "event published");
        reached
    }

    /// Registers a new subscriber that sees every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
