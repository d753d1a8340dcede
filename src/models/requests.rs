//! Request DTOs for the local HTTP surface
//!
//! Defines the structure of incoming query strings and request bodies.

use serde::Deserialize;

use crate::cart::ProductRef;

/// Query for `GET /products`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    /// Restrict to one category (filtered locally)
    #[serde(default)]
    pub category: Option<u64>,
}

/// Body for `PUT /cart/panel`
#[derive(Debug, Clone, Deserialize)]
pub struct PanelRequest {
    pub open: bool,
}

/// Body for `POST /cache/invalidate`
///
/// Without a key the whole cache is wiped and the version bumped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub key: Option<String>,
}

impl InvalidateRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        match &self.key {
            Some(key) if key.trim().is_empty() => Some("Key cannot be empty".to_string()),
            _ => None,
        }
    }
}

/// Body for `PUT /cache/version`
#[derive(Debug, Clone, Deserialize)]
pub struct VersionRequest {
    pub version: u64,
}

/// Validates a product handed to `POST /cart/items`.
pub fn validate_product(product: &ProductRef) -> Option<String> {
    if product.name.trim().is_empty() {
        return Some("Product name cannot be empty".to_string());
    }
    if product.price.is_sign_negative() {
        return Some("Product price cannot be negative".to_string());
    }
    None
}
