//! Request and Response models for the local HTTP surface
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_product, InvalidateRequest, PanelRequest, ProductQuery, VersionRequest};
pub use responses::{
    CacheResetResponse, CartResponse, HealthResponse, StatsResponse, ToggleResponse,
    WishlistResponse,
};
