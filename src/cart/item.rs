//! Cart line types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::lenient;

/// Identifier of a catalog product.
pub type ProductId = u64;

// == Product Ref ==
/// What a consumer hands to `add_item`: enough of a product to build a line.
///
/// Numeric fields are normalized here, the remote API may send strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductRef {
    #[serde(deserialize_with = "lenient::whole")]
    pub id: ProductId,
    pub name: String,
    #[serde(deserialize_with = "lenient::decimal")]
    pub price: Decimal,
    #[serde(default, alias = "image_url", alias = "imageRef")]
    pub image: Option<String>,
}

// == Cart Item ==
/// One line of the cart. `quantity` is never zero while stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(deserialize_with = "lenient::whole")]
    pub id: ProductId,
    pub name: String,
    #[serde(
        serialize_with = "rust_decimal::serde::str::serialize",
        deserialize_with = "lenient::decimal"
    )]
    pub unit_price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(deserialize_with = "lenient::quantity")]
    pub quantity: u32,
}

impl CartItem {
    /// A fresh line with quantity 1.
    pub fn from_product(product: ProductRef) -> Self {
        Self {
            id: product.id,
            name: product.name,
            unit_price: product.price,
            image: product.image,
            quantity: 1,
        }
    }

    /// `unit_price * quantity`
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_ref_from_string_fields() {
        let product: ProductRef = serde_json::from_value(json!({
            "id": "42",
            "name": "Salted caramel",
            "price": "3.20",
            "image_url": "/img/caramel.png"
        }))
        .unwrap();

        assert_eq!(product.id, 42);
        assert_eq!(product.price, Decimal::new(320, 2));
        assert_eq!(product.image.as_deref(), Some("/img/caramel.png"));
    }

    #[test]
    fn test_line_total() {
        let mut item = CartItem::from_product(ProductRef {
            id: 1,
            name: "Truffle".to_string(),
            price: Decimal::new(150, 2),
            image: None,
        });
        item.quantity = 3;

        assert_eq!(item.line_total(), Decimal::new(450, 2));
    }

    #[test]
    fn test_cart_item_persisted_shape() {
        let item = CartItem {
            id: 5,
            name: "Brittle".to_string(),
            unit_price: Decimal::new(275, 2),
            image: None,
            quantity: 2,
        };
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["unit_price"], "2.75");
        let back: CartItem = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}
