//! Checkout orchestration: the online and offline sale paths.

use chrono::Utc;

use mostrador_catalog::ProductIndex;
use mostrador_core::ProductId;
use mostrador_sales::{Cart, CartError, Sale, SaleLine};
use mostrador_store::{LocalStore, StoreError};

use crate::connectivity::ConnectivityMonitor;
use crate::error::{CheckoutError, SyncError};
use crate::remote::RemoteInventory;
use crate::types::{CheckoutOutcome, Vendor};

/// Used when the seller leaves the client-name field empty.
const DEFAULT_CLIENT: &str = "Cliente General";

/// Finalizes the cart into a durably recorded sale.
pub struct CheckoutEngine<'a, R> {
    remote: &'a R,
    store: &'a LocalStore,
    connectivity: &'a ConnectivityMonitor,
}

impl<'a, R: RemoteInventory> CheckoutEngine<'a, R> {
    pub fn new(
        remote: &'a R,
        store: &'a LocalStore,
        connectivity: &'a ConnectivityMonitor,
    ) -> Self {
        Self {
            remote,
            store,
            connectivity,
        }
    }

    /// Complete the current sale.
    ///
    /// Validation runs before any remote or local write, so a rejected
    /// checkout has no side effects. The cart (in memory and the persisted
    /// record) is cleared only after the sale is durably recorded.
    ///
    /// Online partial-failure policy: on the first failed line update the
    /// whole sale is queued as pending. Lines already deducted remotely
    /// keep their `applied` flag so reconciliation replays only the
    /// remainder; the outcome names the split instead of hiding it.
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        client_name: &str,
        vendor: &Vendor,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        if cart.is_empty() {
            return Err(CartError::EmptyCart.into());
        }

        // Defense against stale cart state: re-validate every line against
        // the current known (adjusted) stock.
        let catalog = ProductIndex::from_products(self.store.load_products().await?);
        cart.validate(&catalog)?;

        let client = match client_name.trim() {
            "" => DEFAULT_CLIENT,
            trimmed => trimmed,
        };
        let mut sale = Sale::from_cart(
            cart,
            client,
            vendor.id.clone(),
            vendor.name.clone(),
            Utc::now(),
        );

        if self.connectivity.is_offline() {
            return Ok(self.checkout_offline(cart, sale, vendor).await?);
        }

        self.checkout_online(cart, &mut sale, vendor).await
    }

    async fn checkout_offline(
        &self,
        cart: &mut Cart,
        sale: Sale,
        vendor: &Vendor,
    ) -> Result<CheckoutOutcome, StoreError> {
        self.store.enqueue_pending_sale(&sale).await?;

        // Optimistic decrement so the next validation reflects the queued
        // demand without waiting for a sync round trip.
        let deltas: Vec<(ProductId, i64)> = sale
            .lines
            .iter()
            .map(|l| (l.product_id.clone(), i64::from(l.quantity)))
            .collect();
        self.decrement_replica(&deltas).await?;

        self.clear_cart(cart, vendor).await?;

        tracing::info!(sale = %sale.id, total = sale.total, "sale queued offline");
        Ok(CheckoutOutcome::QueuedOffline(sale))
    }

    async fn checkout_online(
        &self,
        cart: &mut Cart,
        sale: &mut Sale,
        vendor: &Vendor,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        // Confirmed remote stock per applied line; mirrored into the local
        // replica once the sale is recorded.
        let mut confirmed: Vec<(ProductId, i64)> = Vec::with_capacity(sale.lines.len());

        // Lines strictly in cart order, one at a time: interleaving would
        // make partial-failure diagnosis ambiguous.
        for idx in 0..sale.lines.len() {
            match apply_line_remotely(self.remote, &sale.lines[idx]).await {
                Ok(new_stock) => {
                    sale.lines[idx].applied = true;
                    confirmed.push((sale.lines[idx].product_id.clone(), new_stock));
                }
                Err(err) => {
                    return Ok(self
                        .queue_after_failure(cart, sale.clone(), vendor, &confirmed, err)
                        .await?);
                }
            }
        }

        sale.mark_completed();
        self.store.save_completed_sale(sale).await?;
        self.set_replica_stock(&confirmed).await?;
        self.clear_cart(cart, vendor).await?;

        tracing::info!(sale = %sale.id, total = sale.total, "sale completed online");
        Ok(CheckoutOutcome::Completed(sale.clone()))
    }

    /// First remote failure mid-sale: queue the whole sale.
    async fn queue_after_failure(
        &self,
        cart: &mut Cart,
        sale: Sale,
        vendor: &Vendor,
        confirmed: &[(ProductId, i64)],
        err: SyncError,
    ) -> Result<CheckoutOutcome, StoreError> {
        let applied_lines = sale.applied_count();
        tracing::warn!(
            sale = %sale.id,
            applied_lines,
            error = %err,
            "remote failure mid-checkout; queueing whole sale as pending"
        );

        self.store.enqueue_pending_sale(&sale).await?;
        self.store.mark_pending_error(sale.id, &err.to_string()).await?;

        // Applied lines: the remote already holds the new count. Unapplied
        // lines: queued demand, decrement locally.
        self.set_replica_stock(confirmed).await?;
        let deltas: Vec<(ProductId, i64)> = sale
            .lines
            .iter()
            .filter(|l| !l.applied)
            .map(|l| (l.product_id.clone(), i64::from(l.quantity)))
            .collect();
        self.decrement_replica(&deltas).await?;

        self.clear_cart(cart, vendor).await?;

        Ok(CheckoutOutcome::QueuedAfterRemoteFailure {
            sale,
            applied_lines,
            error: err.to_string(),
        })
    }

    async fn clear_cart(&self, cart: &mut Cart, vendor: &Vendor) -> Result<(), StoreError> {
        self.store.clear_cart(&vendor.id).await?;
        cart.clear();
        Ok(())
    }

    async fn decrement_replica(&self, deltas: &[(ProductId, i64)]) -> Result<(), StoreError> {
        if deltas.is_empty() {
            return Ok(());
        }
        let mut products = self.store.load_products().await?;
        for (id, qty) in deltas {
            if let Some(product) = products.iter_mut().find(|p| &p.id == id) {
                product.stock = (product.stock - qty).max(0);
            }
        }
        self.store.save_products(&products).await
    }

    async fn set_replica_stock(&self, updates: &[(ProductId, i64)]) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }
        let mut products = self.store.load_products().await?;
        for (id, stock) in updates {
            if let Some(product) = products.iter_mut().find(|p| &p.id == id) {
                product.stock = *stock;
            }
        }
        self.store.save_products(&products).await
    }
}

/// Re-fetch current remote stock for one line, push the decremented full
/// record, and return the confirmed new stock.
pub(crate) async fn apply_line_remotely<R: RemoteInventory>(
    remote: &R,
    line: &SaleLine,
) -> Result<i64, SyncError> {
    let mut product = remote.fetch_product(&line.product_id).await?;

    let new_stock = product.stock - i64::from(line.quantity);
    if new_stock < 0 {
        return Err(SyncError::InsufficientRemoteStock {
            product: line.product_id.clone(),
            available: product.stock,
            requested: line.quantity,
        });
    }

    product.stock = new_stock;
    remote.update_product(&product).await?;
    Ok(new_stock)
}
