use serde::{Deserialize, Serialize};
use thiserror::Error;

use mostrador_catalog::{Product, ProductIndex};
use mostrador_core::ProductId;

/// Validation failures raised by the cart engine.
///
/// These are user-facing conditions: always recovered locally, never fatal
/// to the session.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CartError {
    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: ProductId,
        requested: u32,
        available: i64,
    },

    #[error("product not found in catalog: {0}")]
    ProductNotFound(ProductId),

    #[error("cart is empty")]
    EmptyCart,

    #[error("quantity must be at least 1")]
    InvalidQuantity,
}

/// One line of the active cart.
///
/// Ephemeral in spirit; also written to the store as the scoped
/// "current cart" record so it survives a reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// In-memory cart owned by the active session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from its persisted lines.
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    pub fn unit_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    fn carted_quantity(&self, product_id: &ProductId) -> u32 {
        self.lines
            .iter()
            .filter(|l| &l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }

    /// Add `quantity` units of `product`, merging into an existing line.
    ///
    /// Rejects the addition when the requested quantity plus whatever is
    /// already carted for the same product exceeds the product's known
    /// (adjusted) stock.
    pub fn add_line(&mut self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let already = self.carted_quantity(&product.id);
        if i64::from(already) + i64::from(quantity) > product.stock {
            return Err(CartError::InsufficientStock {
                product: product.id.clone(),
                requested: already + quantity,
                available: product.stock,
            });
        }

        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity += quantity,
            None => self.lines.push(CartLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                unit_price: product.price,
                quantity,
            }),
        }

        Ok(())
    }

    /// Remove the whole line for `product_id`. No partial-quantity removal.
    pub fn remove_line(&mut self, product_id: &ProductId) {
        self.lines.retain(|l| &l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Re-validate every line against the current known catalog.
    ///
    /// Defense against stale cart state: the catalog may have been refreshed
    /// (or optimistically decremented) since lines were added.
    pub fn validate(&self, catalog: &ProductIndex) -> Result<(), CartError> {
        for line in &self.lines {
            let product = catalog
                .get(&line.product_id)
                .ok_or_else(|| CartError::ProductNotFound(line.product_id.clone()))?;

            if i64::from(line.quantity) > product.stock {
                return Err(CartError::InsufficientStock {
                    product: line.product_id.clone(),
                    requested: line.quantity,
                    available: product.stock,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mostrador_core::CategoryId;

    fn product(id: &str, price: f64, stock: i64) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("product {id}"),
            price,
            stock,
            category: Some(CategoryId::from("general")),
        }
    }

    #[test]
    fn add_line_appends_then_merges() {
        let mut cart = Cart::new();
        let p = product("a", 2.5, 10);

        cart.add_line(&p, 2).unwrap();
        cart.add_line(&p, 3).unwrap();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
        assert_eq!(cart.unit_count(), 5);
    }

    #[test]
    fn add_line_rejects_beyond_known_stock() {
        let mut cart = Cart::new();
        let p = product("a", 2.5, 4);

        cart.add_line(&p, 3).unwrap();
        let err = cart.add_line(&p, 2).unwrap_err();

        match err {
            CartError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 5);
                assert_eq!(available, 4);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        // The failed addition must not change the cart.
        assert_eq!(cart.unit_count(), 3);
    }

    #[test]
    fn add_line_rejects_zero_quantity() {
        let mut cart = Cart::new();
        let p = product("a", 1.0, 10);

        assert_eq!(cart.add_line(&p, 0), Err(CartError::InvalidQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn remove_line_drops_whole_line() {
        let mut cart = Cart::new();
        let a = product("a", 1.0, 10);
        let b = product("b", 1.0, 10);
        cart.add_line(&a, 4).unwrap();
        cart.add_line(&b, 1).unwrap();

        cart.remove_line(&a.id);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].product_id, b.id);
    }

    #[test]
    fn validate_names_the_offending_product() {
        let mut cart = Cart::new();
        let p = product("a", 1.0, 10);
        cart.add_line(&p, 8).unwrap();

        // Catalog refreshed in the meantime; stock dropped below the cart.
        let catalog = ProductIndex::from_products(vec![product("a", 1.0, 5)]);
        let err = cart.validate(&catalog).unwrap_err();

        match err {
            CartError::InsufficientStock { product, .. } => {
                assert_eq!(product, ProductId::from("a"));
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_unknown_product() {
        let mut cart = Cart::new();
        let p = product("gone", 1.0, 10);
        cart.add_line(&p, 1).unwrap();

        let catalog = ProductIndex::from_products(vec![product("a", 1.0, 5)]);
        assert_eq!(
            cart.validate(&catalog),
            Err(CartError::ProductNotFound(ProductId::from("gone")))
        );
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: the cart total always equals the sum over lines of
            /// unit price times quantity, under arbitrary add sequences.
            #[test]
            fn total_is_sum_of_line_subtotals(
                adds in prop::collection::vec((0usize..4, 1u32..5), 0..20)
            ) {
                let products: Vec<Product> = (0..4)
                    .map(|i| product(&format!("p{i}"), (i as f64 + 1.0) * 0.5, 1_000))
                    .collect();

                let mut cart = Cart::new();
                for (idx, qty) in adds {
                    cart.add_line(&products[idx], qty).unwrap();
                }

                let expected: f64 = cart
                    .lines()
                    .iter()
                    .map(|l| l.unit_price * f64::from(l.quantity))
                    .sum();
                prop_assert!((cart.total() - expected).abs() < 1e-9);
            }

            /// Property: merging never creates duplicate lines for a product.
            #[test]
            fn one_line_per_product(
                adds in prop::collection::vec((0usize..3, 1u32..4), 0..15)
            ) {
                let products: Vec<Product> = (0..3)
                    .map(|i| product(&format!("p{i}"), 1.0, 1_000))
                    .collect();

                let mut cart = Cart::new();
                for (idx, qty) in adds {
                    cart.add_line(&products[idx], qty).unwrap();
                }

                let mut seen = std::collections::HashSet::new();
                for line in cart.lines() {
                    prop_assert!(seen.insert(line.product_id.clone()));
                }
            }
        }
    }
}
