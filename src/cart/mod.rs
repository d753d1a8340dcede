//! Cart Module
//!
//! Persistent, reactive shopping cart with merge-on-add and
//! decrement-on-remove semantics.

mod item;
mod store;

#[cfg(test)]
mod property_tests;

pub use item::{CartItem, ProductId, ProductRef};
pub use store::{CartStore, SharedCart};
