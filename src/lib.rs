//! Sweetshop - client-side data layer for a confectionery storefront
//!
//! Cache-aside access to the remote catalog with request collapsing,
//! mutation-triggered invalidation, a persisted cart and a synchronized
//! wishlist.

pub mod api;
pub mod cache;
pub mod cart;
pub mod config;
pub mod error;
pub mod events;
pub mod lenient;
pub mod models;
pub mod remote;
pub mod services;
pub mod storage;
pub mod tasks;
pub mod wishlist;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{AppError, Result};
pub use events::{EventBus, StoreEvent};
pub use tasks::spawn_cleanup_task;
