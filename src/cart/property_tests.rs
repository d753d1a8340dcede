//! Property-Based Tests for the Cart Aggregate
//!
//! Checks the merge and decrement laws against a simple quantity model.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cart::{CartStore, ProductId, ProductRef};
use crate::events::EventBus;
use crate::storage::MemoryStorage;

#[derive(Debug, Clone)]
enum CartOp {
    Add(ProductId),
    Remove(ProductId),
    RemoveFull(ProductId),
    Clear,
}

fn cart_op_strategy() -> impl Strategy<Value = CartOp> {
    prop_oneof![
        4 => (1u64..6).prop_map(CartOp::Add),
        3 => (1u64..6).prop_map(CartOp::Remove),
        1 => (1u64..6).prop_map(CartOp::RemoveFull),
        1 => Just(CartOp::Clear),
    ]
}

fn product(id: ProductId) -> ProductRef {
    ProductRef {
        id,
        name: format!("sweet-{id}"),
        price: Decimal::new(100 + id as i64, 2),
        image: None,
    }
}

fn new_cart() -> CartStore {
    CartStore::new(Arc::new(MemoryStorage::new()), EventBus::default())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // For any operation sequence: at most one line per id, no line at zero,
    // and quantities match the model.
    #[test]
    fn prop_cart_matches_quantity_model(ops in prop::collection::vec(cart_op_strategy(), 1..80)) {
        let mut cart = new_cart();
        let mut model: HashMap<ProductId, u32> = HashMap::new();

        for op in ops {
            match op {
                CartOp::Add(id) => {
                    cart.add_item(product(id));
                    *model.entry(id).or_insert(0) += 1;
                }
                CartOp::Remove(id) => {
                    cart.remove_item(id);
                    if let Some(qty) = model.get_mut(&id) {
                        *qty -= 1;
                        if *qty == 0 {
                            model.remove(&id);
                        }
                    }
                }
                CartOp::RemoveFull(id) => {
                    cart.remove_full_item(id);
                    model.remove(&id);
                }
                CartOp::Clear => {
                    cart.clear();
                    model.clear();
                }
            }

            let mut seen = std::collections::HashSet::new();
            for item in cart.items() {
                prop_assert!(item.quantity >= 1, "line {} stored at zero", item.id);
                prop_assert!(seen.insert(item.id), "duplicate line for {}", item.id);
            }
        }

        prop_assert_eq!(cart.items().len(), model.len());
        for (id, qty) in &model {
            prop_assert_eq!(cart.quantity_of(*id), *qty);
        }
    }

    // Adding n units then removing n units always leaves the cart as it was.
    #[test]
    fn prop_add_then_remove_restores(id in 1u64..100, n in 1u32..20) {
        let mut cart = new_cart();
        for _ in 0..n {
            cart.add_item(product(id));
        }
        prop_assert_eq!(cart.items().len(), 1);
        prop_assert_eq!(cart.quantity_of(id), n);

        for _ in 0..n {
            cart.remove_item(id);
        }
        prop_assert!(cart.is_empty());

        // Extra removals never underflow
        prop_assert_eq!(cart.remove_item(id), None);
        prop_assert!(cart.is_empty());
    }
}
