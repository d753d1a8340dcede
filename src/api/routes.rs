//! API Routes
//!
//! Configures the Axum router with every storefront endpoint.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    add_cart_item_handler, admin_create_handler, admin_delete_handler, admin_settings_handler,
    admin_update_handler, cart_handler, categories_handler, clear_cart_handler, events_handler,
    health_handler, invalidate_handler, product_handler, products_handler,
    remove_cart_item_handler, remove_full_cart_item_handler, set_panel_handler,
    set_version_handler, settings_handler, stats_handler, toggle_panel_handler,
    toggle_wishlist_handler, wishlist_handler, wishlist_products_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        // Catalog
        .route("/settings", get(settings_handler))
        .route("/categories", get(categories_handler))
        .route("/products", get(products_handler))
        .route("/products/:id", get(product_handler))
        // Cart
        .route("/cart", get(cart_handler).delete(clear_cart_handler))
        .route("/cart/items", post(add_cart_item_handler))
        .route("/cart/items/:id", delete(remove_cart_item_handler))
        .route("/cart/items/:id/all", delete(remove_full_cart_item_handler))
        .route("/cart/panel/toggle", post(toggle_panel_handler))
        .route("/cart/panel", put(set_panel_handler))
        // Wishlist
        .route("/wishlist", get(wishlist_handler))
        .route("/wishlist/products", get(wishlist_products_handler))
        .route("/wishlist/:id/toggle", post(toggle_wishlist_handler))
        // Cache
        .route("/cache/stats", get(stats_handler))
        .route("/cache/invalidate", post(invalidate_handler))
        .route("/cache/version", put(set_version_handler))
        // Admin
        .route("/admin/settings", put(admin_settings_handler))
        .route("/admin/:resource", post(admin_create_handler))
        .route(
            "/admin/:resource/:id",
            put(admin_update_handler).delete(admin_delete_handler),
        )
        .route("/events", get(events_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
