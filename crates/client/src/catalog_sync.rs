//! Catalog refresh with pending-demand adjustment.

use mostrador_catalog::apply_demand;
use mostrador_core::VendorId;
use mostrador_sales::pending_demand;
use mostrador_store::LocalStore;

use crate::error::SyncError;
use crate::remote::RemoteInventory;

/// Pulls categories and products from the remote service and replaces the
/// local replica, with stock adjusted for locally-queued-but-unsynced
/// deductions.
///
/// Without the adjustment, a seller who made offline sales of an item
/// would see stale (too-high) stock in the gap between reconnecting and
/// the queue draining, and could oversell it.
pub struct CatalogSync<'a, R> {
    remote: &'a R,
    store: &'a LocalStore,
}

impl<'a, R: RemoteInventory> CatalogSync<'a, R> {
    pub fn new(remote: &'a R, store: &'a LocalStore) -> Self {
        Self { remote, store }
    }

    /// Refresh the replica. A network failure leaves the existing replica
    /// untouched; the caller falls back to the last-known-good cache.
    pub async fn refresh(&self, vendor_id: &VendorId) -> Result<usize, SyncError> {
        // Both fetches happen before any local write, so a remote failure
        // cannot leave a half-replaced replica.
        let categories = self.remote.fetch_categories().await?;
        let mut products = self.remote.fetch_products().await?;

        let pending = self.store.list_pending_sales(vendor_id).await?;
        let demand = pending_demand(&pending);
        apply_demand(&mut products, &demand);

        self.store.save_categories(&categories).await?;
        self.store.save_products(&products).await?;

        tracing::info!(
            products = products.len(),
            categories = categories.len(),
            pending = pending.len(),
            "catalog refreshed"
        );

        Ok(products.len())
    }
}
