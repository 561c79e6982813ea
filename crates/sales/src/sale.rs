use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mostrador_core::{ProductId, SaleId, VendorId};

use crate::cart::{Cart, CartLine};

/// Sale lifecycle state.
///
/// `Pending → Completed` is performed exclusively by the reconciliation
/// engine (or by a fully successful online checkout); a completed sale is
/// never mutated again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Pending,
    Completed,
}

/// One line of a recorded sale.
///
/// `applied` tracks whether this line's remote stock deduction has been
/// confirmed. A sale queued after a partial online failure keeps the flags
/// of the lines that already went through, so replaying the sale deducts
/// each line exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: f64,
    pub quantity: u32,
    #[serde(default)]
    pub applied: bool,
}

impl SaleLine {
    pub fn subtotal(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

impl From<CartLine> for SaleLine {
    fn from(line: CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name,
            unit_price: line.unit_price,
            quantity: line.quantity,
            applied: false,
        }
    }
}

/// A sale recorded at checkout time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub client: String,
    pub lines: Vec<SaleLine>,
    pub total: f64,
    pub created_at: DateTime<Utc>,
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub status: SaleStatus,
}

impl Sale {
    /// Build a pending sale from the cart. The total is derived from the
    /// lines, so it always equals the sum of line subtotals.
    pub fn from_cart(
        cart: &Cart,
        client: impl Into<String>,
        vendor_id: VendorId,
        vendor_name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let lines: Vec<SaleLine> = cart.lines().iter().cloned().map(SaleLine::from).collect();
        let total = lines.iter().map(SaleLine::subtotal).sum();

        Self {
            id: SaleId::new(),
            client: client.into(),
            lines,
            total,
            created_at,
            vendor_id,
            vendor_name: vendor_name.into(),
            status: SaleStatus::Pending,
        }
    }

    pub fn all_applied(&self) -> bool {
        self.lines.iter().all(|l| l.applied)
    }

    pub fn applied_count(&self) -> usize {
        self.lines.iter().filter(|l| l.applied).count()
    }

    pub fn unit_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn mark_completed(&mut self) {
        self.status = SaleStatus::Completed;
    }
}

/// Total quantity per product still committed to pending sales.
///
/// Lines whose deduction was already confirmed remotely (`applied`) are
/// excluded: the remote count already reflects them.
pub fn pending_demand(sales: &[Sale]) -> HashMap<ProductId, i64> {
    let mut demand: HashMap<ProductId, i64> = HashMap::new();
    for sale in sales {
        for line in sale.lines.iter().filter(|l| !l.applied) {
            *demand.entry(line.product_id.clone()).or_default() += i64::from(line.quantity);
        }
    }
    demand
}

#[cfg(test)]
mod tests {
    use super::*;
    use mostrador_catalog::Product;

    fn product(id: &str, price: f64, stock: i64) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("product {id}"),
            price,
            stock,
            category: None,
        }
    }

    fn sample_cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_line(&product("a", 2.0, 100), 3).unwrap();
        cart.add_line(&product("b", 5.5, 100), 2).unwrap();
        cart
    }

    #[test]
    fn from_cart_derives_total_from_lines() {
        let sale = Sale::from_cart(
            &sample_cart(),
            "Cliente General",
            VendorId::from("v1"),
            "Maria",
            Utc::now(),
        );

        assert_eq!(sale.status, SaleStatus::Pending);
        assert_eq!(sale.lines.len(), 2);
        assert!((sale.total - 17.0).abs() < 1e-9);
        assert!(sale.lines.iter().all(|l| !l.applied));
    }

    #[test]
    fn pending_demand_sums_quantities_per_product() {
        let vendor = VendorId::from("v1");
        let s1 = Sale::from_cart(&sample_cart(), "c", vendor.clone(), "Maria", Utc::now());
        let s2 = Sale::from_cart(&sample_cart(), "c", vendor, "Maria", Utc::now());

        let demand = pending_demand(&[s1, s2]);

        assert_eq!(demand[&ProductId::from("a")], 6);
        assert_eq!(demand[&ProductId::from("b")], 4);
    }

    #[test]
    fn pending_demand_skips_applied_lines() {
        let mut sale = Sale::from_cart(
            &sample_cart(),
            "c",
            VendorId::from("v1"),
            "Maria",
            Utc::now(),
        );
        sale.lines[0].applied = true;

        let demand = pending_demand(&[sale]);

        assert!(!demand.contains_key(&ProductId::from("a")));
        assert_eq!(demand[&ProductId::from("b")], 2);
    }
}
