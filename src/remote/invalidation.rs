//! Mutation-Triggered Invalidation
//!
//! Any successful create/update/delete against the remote API wipes the whole
//! cache and bumps its version, so no call site has to invalidate by hand.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tracing::info;

use crate::cache::SharedCache;
use crate::remote::ResponseObserver;

/// Verbs that change remote state.
pub fn is_mutating(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH, Method::DELETE].contains(method)
}

#[derive(Clone)]
pub struct MutationInvalidator {
    cache: SharedCache,
}

impl MutationInvalidator {
    pub fn new(cache: SharedCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ResponseObserver for MutationInvalidator {
    async fn on_response(&self, method: &Method, status: StatusCode) {
        if is_mutating(method) && status.is_success() {
            self.cache.write().await.invalidate(None);
            info!(%method, "remote write succeeded, cache invalidated");
        }
    }
}
