//! Admin writes against the remote API.
//!
//! Every write goes through the observed [`ApiClient`], so a success already
//! wiped the cache by the time the call returns; the per-resource invalidation
//! here keeps the contract explicit for each resource type.

use std::fmt;
use std::str::FromStr;

use reqwest::multipart::Form;
use reqwest::Method;
use serde_json::Value;
use tracing::info;

use crate::error::{AppError, Result};
use crate::events::{EventBus, StoreEvent};
use crate::remote::ApiClient;
use crate::services::catalog::{CategoryService, ProductService, SettingsService};

// == Admin Resource ==
/// Collections an admin can write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminResource {
    Categories,
    Products,
}

impl AdminResource {
    pub fn path(self) -> &'static str {
        match self {
            AdminResource::Categories => "/categories",
            AdminResource::Products => "/products",
        }
    }
}

impl FromStr for AdminResource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "categories" => Ok(AdminResource::Categories),
            "products" => Ok(AdminResource::Products),
            other => Err(AppError::InvalidRequest(format!("unknown resource '{other}'"))),
        }
    }
}

impl fmt::Display for AdminResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

// == Admin Service ==
#[derive(Clone)]
pub struct AdminService {
    client: ApiClient,
    settings: SettingsService,
    categories: CategoryService,
    products: ProductService,
    events: EventBus,
}

impl AdminService {
    pub fn new(
        client: ApiClient,
        settings: SettingsService,
        categories: CategoryService,
        products: ProductService,
        events: EventBus,
    ) -> Self {
        Self {
            client,
            settings,
            categories,
            products,
            events,
        }
    }

    pub async fn create(&self, resource: AdminResource, body: &Value) -> Result<Value> {
        let response = self
            .client
            .send_json(Method::POST, resource.path(), Some(body))
            .await?;
        self.after_write(resource, None).await;
        Ok(response)
    }

    pub async fn update(&self, resource: AdminResource, id: u64, body: &Value) -> Result<Value> {
        let path = format!("{}/{}", resource.path(), id);
        let response = self.client.send_json(Method::PUT, &path, Some(body)).await?;
        self.after_write(resource, Some(id)).await;
        Ok(response)
    }

    pub async fn delete(&self, resource: AdminResource, id: u64) -> Result<Value> {
        let path = format!("{}/{}", resource.path(), id);
        let response = self.client.send_json(Method::DELETE, &path, None).await?;
        self.after_write(resource, Some(id)).await;
        Ok(response)
    }

    /// Creates (`id = None`) or updates a record from a multipart form, for
    /// writes that carry an image upload.
    pub async fn upload(&self, resource: AdminResource, id: Option<u64>, form: Form) -> Result<Value> {
        let (method, path) = match id {
            Some(id) => (Method::PUT, format!("{}/{}", resource.path(), id)),
            None => (Method::POST, resource.path().to_string()),
        };
        let response = self.client.send_multipart(method, &path, form).await?;
        self.after_write(resource, id).await;
        Ok(response)
    }

    /// Writes shop settings and notifies subscribers.
    pub async fn update_settings(&self, body: &Value) -> Result<Value> {
        let response = self.client.send_json(Method::PUT, "/settings", Some(body)).await?;
        self.settings.invalidate().await;
        self.events.publish(StoreEvent::SettingsUpdated);
        info!("settings updated");
        Ok(response)
    }

    async fn after_write(&self, resource: AdminResource, id: Option<u64>) {
        match resource {
            AdminResource::Categories => self.categories.invalidate().await,
            AdminResource::Products => self.products.invalidate(id).await,
        }
        info!(%resource, ?id, "admin write applied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_parsing() {
        assert_eq!("categories".parse::<AdminResource>().unwrap(), AdminResource::Categories);
        assert_eq!("products".parse::<AdminResource>().unwrap(), AdminResource::Products);
        assert!(matches!(
            "orders".parse::<AdminResource>(),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(AdminResource::Categories.path(), "/categories");
        assert_eq!(AdminResource::Products.to_string(), "products");
    }
}
