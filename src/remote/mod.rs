//! Remote Module
//!
//! HTTP access to the storefront REST API and the response-side hooks.

mod client;
mod invalidation;

pub use client::{ApiClient, RemoteSource, ResponseObserver};
pub use invalidation::{is_mutating, MutationInvalidator};
