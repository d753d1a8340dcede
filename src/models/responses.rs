//! Response DTOs for the local HTTP surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::cache::CacheStats;
use crate::cart::{CartItem, CartStore, ProductId};

/// Cart snapshot returned by every cart endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub panel_open: bool,
    pub total_quantity: u32,
    #[serde(serialize_with = "rust_decimal::serde::str::serialize")]
    pub total_price: Decimal,
}

impl CartResponse {
    pub fn from_store(cart: &CartStore) -> Self {
        Self {
            items: cart.items().to_vec(),
            panel_open: cart.is_panel_open(),
            total_quantity: cart.total_quantity(),
            total_price: cart.total_price(),
        }
    }
}

/// Response body for `GET /wishlist`
#[derive(Debug, Clone, Serialize)]
pub struct WishlistResponse {
    pub ids: Vec<ProductId>,
    pub count: usize,
}

impl WishlistResponse {
    pub fn new(ids: Vec<ProductId>) -> Self {
        Self {
            count: ids.len(),
            ids,
        }
    }
}

/// Response body for `POST /wishlist/:id/toggle`
#[derive(Debug, Clone, Serialize)]
pub struct ToggleResponse {
    pub id: ProductId,
    pub liked: bool,
    pub count: usize,
}

/// Response body for the stats endpoint (GET /cache/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub invalidations: u64,
    pub total_entries: usize,
    pub version: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            invalidations: stats.invalidations,
            total_entries: stats.total_entries,
            version: stats.version,
        }
    }
}

/// Response body for cache invalidation and version changes.
#[derive(Debug, Clone, Serialize)]
pub struct CacheResetResponse {
    pub message: String,
    pub version: u64,
    pub total_entries: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
