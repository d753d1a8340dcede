//! Services Module
//!
//! Cache-aside access to the remote read-models and the admin write path.

mod admin;
mod catalog;
mod fetch;

pub use admin::{AdminResource, AdminService};
pub use catalog::{Category, CategoryService, Product, ProductService, Settings, SettingsService};
pub use fetch::{coerce_list, decode_list, FetchService, Resource};

#[cfg(test)]
pub(crate) use fetch::testing as fetch_testing;
