use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use mostrador_core::{CategoryId, ProductId};

/// Product replica with current (possibly adjusted) stock.
///
/// The authoritative record lives on the remote inventory service. The copy
/// held locally has its stock adjusted for locally queued, not-yet-synced
/// sales so the displayed stock never overcounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Unit price as a JSON number on the wire.
    pub price: f64,
    pub stock: i64,
    pub category: Option<CategoryId>,
}

impl Product {
    pub fn is_out_of_stock(&self) -> bool {
        self.stock <= 0
    }
}

/// Lookup index over the in-memory catalog, keyed by product id.
#[derive(Debug, Clone, Default)]
pub struct ProductIndex {
    by_id: HashMap<ProductId, Product>,
}

impl ProductIndex {
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            by_id: products
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        }
    }

    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.by_id.values()
    }
}

/// Subtract pending local demand from a freshly fetched product list.
///
/// `demand` maps product id to the total quantity committed to locally
/// pending sales. Stock is clamped at zero: displayed stock must never go
/// negative even when the queue temporarily exceeds the remote count.
pub fn apply_demand(products: &mut [Product], demand: &HashMap<ProductId, i64>) {
    for product in products.iter_mut() {
        if let Some(qty) = demand.get(&product.id) {
            product.stock = (product.stock - qty).max(0);
        }
    }
}
