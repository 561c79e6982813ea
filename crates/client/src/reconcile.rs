//! Reconciliation: replaying the pending-sale queue against the remote
//! service once connectivity is available.

use mostrador_core::VendorId;
use mostrador_sales::Sale;
use mostrador_store::LocalStore;

use crate::catalog_sync::CatalogSync;
use crate::checkout::apply_line_remotely;
use crate::connectivity::ConnectivityMonitor;
use crate::error::SyncError;
use crate::remote::RemoteInventory;
use crate::types::SyncReport;

/// Drains the pending-sale queue, enforcing at-least-once delivery with
/// idempotent-leaning retry.
///
/// Sales are processed strictly one at a time in queue order, and lines
/// strictly one at a time in sale order: two queued sales racing over the
/// same product's remote stock would double-deduct it.
pub struct Reconciler<'a, R> {
    remote: &'a R,
    store: &'a LocalStore,
    connectivity: &'a ConnectivityMonitor,
}

impl<'a, R: RemoteInventory> Reconciler<'a, R> {
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

    /// Replay every pending sale for `vendor_id`.
    ///
    /// An empty queue is a strict no-op: no remote calls, no indicator
    /// change. A line failure leaves that sale queued (with the failure
    /// recorded on the row) and moves on to the next sale; only store
    /// failures abort the run. The `Syncing` indicator is held through a
    /// guard, so it is released on every exit path.
    pub async fn reconcile(&self, vendor_id: &VendorId) -> Result<SyncReport, SyncError> {
        let pending = self.store.list_pending_sales(vendor_id).await?;
        if pending.is_empty() {
            return Ok(SyncReport::default());
        }

        let Some(_guard) = self.connectivity.begin_sync() else {
            tracing::debug!("reconciliation already in progress; skipping trigger");
            return Ok(SyncReport {
                synced: 0,
                still_pending: pending.len(),
            });
        };

        tracing::info!(pending = pending.len(), vendor = %vendor_id, "reconciliation started");
        let mut report = SyncReport::default();

        for mut sale in pending {
            match self.replay_sale(&mut sale).await {
                Ok(()) => {
                    sale.mark_completed();
                    self.store.complete_sale(&sale).await?;
                    report.synced += 1;
                    tracing::info!(sale = %sale.id, "pending sale reconciled");
                }
                Err(SyncError::Store(err)) => return Err(err.into()),
                Err(err) => {
                    self.store.mark_pending_error(sale.id, &err.to_string()).await?;
                    report.still_pending += 1;
                    tracing::warn!(sale = %sale.id, error = %err, "sale left queued for retry");
                }
            }
        }

        // Refresh the replica so displayed stock reflects the deductions
        // just applied remotely. Recoverable if it fails; the cached copy
        // stands.
        if let Err(err) = CatalogSync::new(self.remote, self.store).refresh(vendor_id).await {
            tracing::warn!(error = %err, "catalog refresh after reconciliation failed");
        }

        tracing::info!(
            synced = report.synced,
            still_pending = report.still_pending,
            "reconciliation finished"
        );
        Ok(report)
    }

    /// Apply every not-yet-applied line of one sale.
    ///
    /// Progress is persisted after each confirmed line, so a crash between
    /// lines can never deduct the same line twice on the next run.
    async fn replay_sale(&self, sale: &mut Sale) -> Result<(), SyncError> {
        for idx in 0..sale.lines.len() {
            if sale.lines[idx].applied {
                continue;
            }

            apply_line_remotely(self.remote, &sale.lines[idx]).await?;
            sale.lines[idx].applied = true;
            self.store.enqueue_pending_sale(sale).await?;
        }
        Ok(())
    }
}
