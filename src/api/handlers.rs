//! API Handlers
//!
//! HTTP request handlers through which consumers reach the caches and stores.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::cache::{CacheStore, SharedCache};
use crate::cart::{CartStore, ProductId, ProductRef, SharedCart};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::events::EventBus;
use crate::models::{
    validate_product, CacheResetResponse, CartResponse, HealthResponse, InvalidateRequest,
    PanelRequest, ProductQuery, StatsResponse, ToggleResponse, VersionRequest, WishlistResponse,
};
use crate::remote::{ApiClient, MutationInvalidator, RemoteSource};
use crate::services::{
    AdminResource, AdminService, Category, CategoryService, FetchService, Product, ProductService,
    Settings, SettingsService,
};
use crate::storage::{FileStorage, MemoryStorage, SharedStorage};
use crate::wishlist::Wishlist;

/// Application state shared across all handlers.
///
/// Every store is constructed once and handed out by reference.
#[derive(Clone)]
pub struct AppState {
    pub cache: SharedCache,
    pub settings: SettingsService,
    pub categories: CategoryService,
    pub products: ProductService,
    pub cart: SharedCart,
    pub wishlist: Arc<Wishlist>,
    pub admin: AdminService,
    pub events: EventBus,
}

impl AppState {
    /// Wires the stores together.
    ///
    /// `client` carries the admin writes; `reads` serves the fetch services
    /// (normally the same client).
    pub fn assemble(
        cache: SharedCache,
        client: ApiClient,
        reads: Arc<dyn RemoteSource>,
        storage: SharedStorage,
        events: EventBus,
    ) -> Self {
        let settings: SettingsService = FetchService::new(cache.clone(), reads.clone());
        let categories: CategoryService = FetchService::new(cache.clone(), reads.clone());
        let products = ProductService::new(
            FetchService::new(cache.clone(), reads.clone()),
            FetchService::new(cache.clone(), reads),
            events.clone(),
        );
        let admin = AdminService::new(
            client,
            settings.clone(),
            categories.clone(),
            products.clone(),
            events.clone(),
        );

        Self {
            cache,
            settings,
            categories,
            products,
            cart: CartStore::new(storage.clone(), events.clone()).shared(),
            wishlist: Arc::new(Wishlist::new(storage, events.clone())),
            admin,
            events,
        }
    }

    /// Creates the application state from configuration.
    ///
    /// An unusable storage directory degrades to in-memory storage.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage: SharedStorage = match FileStorage::open(&config.storage_dir) {
            Ok(storage) => Arc::new(storage),
            Err(err) => {
                warn!(
                    dir = %config.storage_dir.display(),
                    error = %err,
                    "durable storage unavailable, state will not survive restart"
                );
                Arc::new(MemoryStorage::new())
            }
        };

        let events = EventBus::new(config.event_capacity);
        let cache = CacheStore::new(config.cache_ttl(), storage.clone()).shared();
        let client = ApiClient::new(&config.api_base_url, Duration::from_secs(config.request_timeout))?
            .with_observer(Arc::new(MutationInvalidator::new(cache.clone())));

        Ok(Self::assemble(cache, client.clone(), Arc::new(client), storage, events))
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

// == Catalog ==

/// Handler for GET /settings
pub async fn settings_handler(State(state): State<AppState>) -> Result<Json<Settings>> {
    Ok(Json(state.settings.fetch().await?))
}

/// Handler for GET /categories
pub async fn categories_handler(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.categories.fetch().await?))
}

/// Handler for GET /products?category=<id>
pub async fn products_handler(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = match query.category {
        Some(category) => state.products.by_category(category).await?,
        None => state.products.all().await?,
    };
    Ok(Json(products))
}

/// Handler for GET /products/:id
pub async fn product_handler(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.products.load_detail(id).await?))
}

// == Cart ==

/// Handler for GET /cart
pub async fn cart_handler(State(state): State<AppState>) -> Json<CartResponse> {
    let cart = state.cart.read().await;
    Json(CartResponse::from_store(&cart))
}

/// Handler for POST /cart/items
pub async fn add_cart_item_handler(
    State(state): State<AppState>,
    Json(product): Json<ProductRef>,
) -> Result<Json<CartResponse>> {
    if let Some(error_msg) = validate_product(&product) {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let mut cart = state.cart.write().await;
    cart.add_item(product);
    Ok(Json(CartResponse::from_store(&cart)))
}

/// Handler for DELETE /cart/items/:id
pub async fn remove_cart_item_handler(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Json<CartResponse> {
    let mut cart = state.cart.write().await;
    cart.remove_item(id);
    Json(CartResponse::from_store(&cart))
}

/// Handler for DELETE /cart/items/:id/all
pub async fn remove_full_cart_item_handler(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Json<CartResponse> {
    let mut cart = state.cart.write().await;
    cart.remove_full_item(id);
    Json(CartResponse::from_store(&cart))
}

/// Handler for DELETE /cart
pub async fn clear_cart_handler(State(state): State<AppState>) -> Json<CartResponse> {
    let mut cart = state.cart.write().await;
    cart.clear();
    Json(CartResponse::from_store(&cart))
}

/// Handler for POST /cart/panel/toggle
pub async fn toggle_panel_handler(State(state): State<AppState>) -> Json<CartResponse> {
    let mut cart = state.cart.write().await;
    cart.toggle_panel();
    Json(CartResponse::from_store(&cart))
}

/// Handler for PUT /cart/panel
pub async fn set_panel_handler(
    State(state): State<AppState>,
    Json(req): Json<PanelRequest>,
) -> Json<CartResponse> {
    let mut cart = state.cart.write().await;
    cart.set_panel(req.open);
    Json(CartResponse::from_store(&cart))
}

// == Wishlist ==

/// Handler for GET /wishlist
pub async fn wishlist_handler(State(state): State<AppState>) -> Json<WishlistResponse> {
    Json(WishlistResponse::new(state.wishlist.ids()))
}

/// Handler for POST /wishlist/:id/toggle
pub async fn toggle_wishlist_handler(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Json<ToggleResponse> {
    let liked = state.wishlist.toggle(id);
    Json(ToggleResponse {
        id,
        liked,
        count: state.wishlist.len(),
    })
}

/// Handler for GET /wishlist/products
pub async fn wishlist_products_handler(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.wishlist.hydrate(&state.products).await?))
}

// == Cache ==

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    // Acquire read lock for stats
    let cache = state.cache.read().await;
    Json(StatsResponse::from(cache.stats()))
}

/// Handler for POST /cache/invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    req: Option<Json<InvalidateRequest>>,
) -> Result<Json<CacheResetResponse>> {
    let req = req.map(|Json(req)| req).unwrap_or_default();
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let mut cache = state.cache.write().await;
    cache.invalidate(req.key.as_deref());

    let message = match &req.key {
        Some(key) => format!("Key '{}' invalidated", key),
        None => "Cache cleared".to_string(),
    };
    Ok(Json(CacheResetResponse {
        message,
        version: cache.version(),
        total_entries: cache.len(),
    }))
}

/// Handler for PUT /cache/version
pub async fn set_version_handler(
    State(state): State<AppState>,
    Json(req): Json<VersionRequest>,
) -> Json<CacheResetResponse> {
    let mut cache = state.cache.write().await;
    let wiped = cache.set_version(req.version);

    let message = if wiped {
        format!("Version set to {}, cache cleared", req.version)
    } else {
        format!("Version {} unchanged", req.version)
    };
    Json(CacheResetResponse {
        message,
        version: cache.version(),
        total_entries: cache.len(),
    })
}

// == Admin ==

/// Handler for POST /admin/:resource
pub async fn admin_create_handler(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let resource: AdminResource = resource.parse()?;
    Ok(Json(state.admin.create(resource, &body).await?))
}

/// Handler for PUT /admin/:resource/:id
pub async fn admin_update_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let resource: AdminResource = resource.parse()?;
    Ok(Json(state.admin.update(resource, id, &body).await?))
}

/// Handler for DELETE /admin/:resource/:id
pub async fn admin_delete_handler(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, u64)>,
) -> Result<Json<Value>> {
    let resource: AdminResource = resource.parse()?;
    Ok(Json(state.admin.delete(resource, id).await?))
}

/// Handler for PUT /admin/settings
pub async fn admin_settings_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    Ok(Json(state.admin.update_settings(&body).await?))
}

// == Events ==

/// Handler for GET /events
///
/// Streams every store event as a server-sent event. A subscriber that falls
/// behind skips the missed events and keeps listening.
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.events.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let data = serde_json::to_string(&event).unwrap_or_default();
                    return Some((Ok(Event::default().data(data)), rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetch_testing::FakeRemote;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn test_state(remote: Arc<FakeRemote>) -> AppState {
        let storage: SharedStorage = Arc::new(MemoryStorage::new());
        let cache = CacheStore::new(Duration::from_secs(900), storage.clone()).shared();
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        AppState::assemble(cache, client, remote, storage, EventBus::default())
    }

    fn fudge() -> ProductRef {
        ProductRef {
            id: 1,
            name: "Fudge".to_string(),
            price: Decimal::new(250, 2),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_categories_cached() {
        let remote = Arc::new(FakeRemote::default());
        remote.serve("/categories", Ok(json!([{"id": 1, "name": "Chocolate"}])));
        let state = test_state(remote.clone());

        let first = categories_handler(State(state.clone())).await.unwrap();
        let second = categories_handler(State(state.clone())).await.unwrap();

        assert_eq!(first.0, second.0);
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_products_filtered_by_query() {
        let remote = Arc::new(FakeRemote::default());
        remote.serve(
            "/products",
            Ok(json!([
                {"id": 1, "name": "Fudge", "price": 2, "category_id": 1},
                {"id": 2, "name": "Toffee", "price": 3, "category_id": 2}
            ])),
        );
        let state = test_state(remote);

        let query = ProductQuery { category: Some(2) };
        let products = products_handler(State(state), Query(query)).await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Toffee");
    }

    #[tokio::test]
    async fn test_remote_failure_surfaces() {
        let remote = Arc::new(FakeRemote::default());
        remote.serve("/settings", Err(AppError::Network("down".into())));
        let state = test_state(remote);

        let result = settings_handler(State(state)).await;
        assert!(matches!(result, Err(AppError::Network(_))));
    }

    #[tokio::test]
    async fn test_cart_add_and_remove() {
        let state = test_state(Arc::new(FakeRemote::default()));

        let cart = add_cart_item_handler(State(state.clone()), Json(fudge())).await.unwrap();
        assert_eq!(cart.total_quantity, 1);
        let cart = add_cart_item_handler(State(state.clone()), Json(fudge())).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total_quantity, 2);

        let cart = remove_cart_item_handler(State(state.clone()), Path(1)).await;
        assert_eq!(cart.total_quantity, 1);

        let cart = remove_full_cart_item_handler(State(state), Path(1)).await;
        assert!(cart.items.is_empty());
    }

    #[tokio::test]
    async fn test_cart_rejects_invalid_product() {
        let state = test_state(Arc::new(FakeRemote::default()));
        let mut product = fudge();
        product.name = String::new();

        let result = add_cart_item_handler(State(state), Json(product)).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_panel_handlers() {
        let state = test_state(Arc::new(FakeRemote::default()));

        let cart = toggle_panel_handler(State(state.clone())).await;
        assert!(cart.panel_open);

        let cart = set_panel_handler(State(state), Json(PanelRequest { open: false })).await;
        assert!(!cart.panel_open);
    }

    #[tokio::test]
    async fn test_wishlist_toggle() {
        let state = test_state(Arc::new(FakeRemote::default()));

        let resp = toggle_wishlist_handler(State(state.clone()), Path(8)).await;
        assert!(resp.liked);
        assert_eq!(resp.count, 1);

        let list = wishlist_handler(State(state.clone())).await;
        assert_eq!(list.ids, vec![8]);

        let resp = toggle_wishlist_handler(State(state), Path(8)).await;
        assert!(!resp.liked);
        assert_eq!(resp.count, 0);
    }

    #[tokio::test]
    async fn test_invalidate_and_version() {
        let state = test_state(Arc::new(FakeRemote::default()));
        state.cache.write().await.set("a", json!(1));
        state.cache.write().await.set("b", json!(2));

        let resp = invalidate_handler(
            State(state.clone()),
            Some(Json(InvalidateRequest {
                key: Some("a".to_string()),
            })),
        )
        .await
        .unwrap();
        assert_eq!(resp.total_entries, 1);

        let resp = set_version_handler(State(state.clone()), Json(VersionRequest { version: 5 })).await;
        assert_eq!(resp.version, 5);
        assert_eq!(resp.total_entries, 0);

        let resp = invalidate_handler(State(state), None).await.unwrap();
        assert_ne!(resp.version, 5);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state(Arc::new(FakeRemote::default()));

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
    }

    #[tokio::test]
    async fn test_admin_unknown_resource() {
        let state = test_state(Arc::new(FakeRemote::default()));

        let result = admin_create_handler(State(state), Path("orders".to_string()), Json(json!({}))).await;
        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
