//! Catalog read-models and their fetch services.
//!
//! Settings, categories and products as delivered by the remote API. Fields
//! the state layer does not care about are carried through untouched.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cart::{ProductId, ProductRef};
use crate::error::{AppError, Result};
use crate::events::{EventBus, StoreEvent};
use crate::lenient;
use crate::services::fetch::{coerce_list, decode_list, FetchService, Resource};

// == Settings ==
/// Shop-wide settings object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Settings {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl Resource for Settings {
    const CACHE_KEY: &'static str = "global_settings";
    const PATH: &'static str = "/settings";

    fn decode(payload: Value) -> Result<Self> {
        match payload {
            Value::Object(fields) => Ok(Self { fields }),
            Value::Null => Ok(Self::default()),
            other => Err(AppError::MalformedPayload(format!(
                "settings must be an object, got {other}"
            ))),
        }
    }

    /// Settings may carry `cache_version` as a number or numeric string.
    fn version_hint(payload: &Value) -> Option<u64> {
        match payload.get("cache_version")? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

// == Category ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(deserialize_with = "lenient::whole")]
    pub id: u64,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Vec<Category> {
    const CACHE_KEY: &'static str = "global_categories";
    const PATH: &'static str = "/categories";

    fn normalize(payload: Value) -> Value {
        coerce_list(payload)
    }

    fn decode(payload: Value) -> Result<Self> {
        Ok(decode_list(payload))
    }
}

// == Product ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(deserialize_with = "lenient::whole")]
    pub id: ProductId,
    pub name: String,
    #[serde(
        serialize_with = "rust_decimal::serde::str::serialize",
        deserialize_with = "lenient::decimal"
    )]
    pub price: Decimal,
    #[serde(default, alias = "image_url")]
    pub image: Option<String>,
    #[serde(default, alias = "categoryId", deserialize_with = "lenient::optional_whole")]
    pub category_id: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<&Product> for ProductRef {
    fn from(product: &Product) -> Self {
        ProductRef {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
        }
    }
}

impl Resource for Vec<Product> {
    const CACHE_KEY: &'static str = "global_products";
    const PATH: &'static str = "/products";

    fn normalize(payload: Value) -> Value {
        coerce_list(payload)
    }

    fn decode(payload: Value) -> Result<Self> {
        Ok(decode_list(payload))
    }
}

/// Single product, fetched by id when it is not in the cached collection.
impl Resource for Product {
    const CACHE_KEY: &'static str = "global_product";
    const PATH: &'static str = "/products";

    fn decode(payload: Value) -> Result<Self> {
        serde_json::from_value(payload).map_err(|e| AppError::MalformedPayload(e.to_string()))
    }
}

// == Services ==
pub type SettingsService = FetchService<Settings>;
pub type CategoryService = FetchService<Vec<Category>>;

/// Product catalog backed by the cached, unfiltered product collection.
#[derive(Clone)]
pub struct ProductService {
    list: FetchService<Vec<Product>>,
    detail: FetchService<Product>,
    events: EventBus,
}

impl ProductService {
    pub fn new(
        list: FetchService<Vec<Product>>,
        detail: FetchService<Product>,
        events: EventBus,
    ) -> Self {
        Self { list, detail, events }
    }

    /// The whole collection.
    pub async fn all(&self) -> Result<Vec<Product>> {
        self.list.fetch().await
    }

    /// Products of one category, filtered locally from the cached collection.
    pub async fn by_category(&self, category_id: u64) -> Result<Vec<Product>> {
        let products = self.all().await?;
        Ok(products
            .into_iter()
            .filter(|product| product.category_id == Some(category_id))
            .collect())
    }

    /// Looks a product up in the cached collection only.
    pub async fn find(&self, id: ProductId) -> Result<Option<Product>> {
        let products = self.all().await?;
        Ok(products.into_iter().find(|product| product.id == id))
    }

    /// Resolves one product for a detail view and announces it.
    ///
    /// Falls back to the single-product endpoint when the collection does not
    /// contain `id`.
    pub async fn load_detail(&self, id: ProductId) -> Result<Product> {
        let product = match self.find(id).await? {
            Some(product) => product,
            None => match self.detail.fetch_with(Some(&id.to_string())).await {
                Ok(product) => product,
                Err(AppError::RemoteStatus { status: 404, .. }) => {
                    return Err(AppError::NotFound(format!("product {id}")));
                }
                Err(err) => return Err(err),
            },
        };

        self.events.publish(StoreEvent::ProductLoaded {
            id: product.id,
            name: product.name.clone(),
            category_id: product.category_id,
        });
        Ok(product)
    }

    /// Drops the cached collection and, if given, one cached detail.
    pub async fn invalidate(&self, id: Option<ProductId>) {
        self.list.invalidate().await;
        if let Some(id) = id {
            self.detail.invalidate_with(&id.to_string()).await;
        }
    }
}
