//! Background worker for periodic reachability probing and re-sync.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::context::AppContext;
use crate::remote::RemoteInventory;

/// How often the remote service is probed. Browser-style online/offline
/// signals can be unreliable reachability indicators, so the worker
/// supplements them on a coarse interval.
const PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Ceiling for the retry backoff after consecutive sync failures.
const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Background sync worker.
///
/// Probes reachability, keeps the connectivity state current, and on an
/// offline-to-online transition triggers catalog sync then reconciliation
/// (in that order). Applies capped exponential backoff after consecutive
/// failures so a degraded remote service is not hammered.
pub struct SyncWorker<R> {
    ctx: Arc<AppContext<R>>,
    shutdown: Arc<Notify>,
    probe_interval: Duration,
}

impl<R: RemoteInventory + 'static> SyncWorker<R> {
    pub fn new(ctx: Arc<AppContext<R>>) -> Self {
        Self {
            ctx,
            shutdown: Arc::new(Notify::new()),
            probe_interval: PROBE_INTERVAL,
        }
    }

    /// Override the probe interval (tests).
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    /// Handle for requesting graceful shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Spawn the worker loop.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        tracing::info!("background sync worker started");

        let mut probe = tokio::time::interval(self.probe_interval);
        probe.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut consecutive_failures = 0u32;

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    tracing::info!("background sync worker received shutdown signal");
                    break;
                }
                _ = probe.tick() => {
                    if let Err(()) = self.tick().await {
                        consecutive_failures += 1;
                        let backoff = backoff_for(consecutive_failures);
                        tracing::warn!(
                            consecutive_failures,
                            ?backoff,
                            "sync failed; backing off before next attempt"
                        );
                        tokio::time::sleep(backoff).await;
                    } else {
                        consecutive_failures = 0;
                    }
                }
            }
        }

        tracing::info!("background sync worker stopped");
    }

    async fn tick(&self) -> Result<(), ()> {
        let Some(vendor) = self.ctx.vendor() else {
            tracing::debug!("no active vendor; skipping probe");
            return Ok(());
        };

        let connectivity = self.ctx.connectivity();
        if !self.ctx.remote().ping().await {
            tracing::debug!("remote unreachable");
            connectivity.set_offline();
            return Ok(());
        }

        let was_offline = connectivity.is_offline();
        connectivity.set_online();

        let pending = self.ctx.pending_count().await.map_err(|err| {
            tracing::error!(error = %err, "failed to read pending count");
        })?;

        if !was_offline && pending == 0 {
            return Ok(());
        }

        // Catalog first so the replica is demand-adjusted before the queue
        // drains, then reconciliation.
        if let Err(err) = self.ctx.catalog_sync().refresh(&vendor.id).await {
            tracing::warn!(error = %err, "catalog sync failed; keeping cached replica");
        }

        match self.ctx.reconciler().reconcile(&vendor.id).await {
            Ok(report) => {
                if report.still_pending > 0 {
                    tracing::warn!(
                        still_pending = report.still_pending,
                        "reconciliation left sales queued"
                    );
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "reconciliation failed; will retry");
                Err(())
            }
        }
    }
}

fn backoff_for(consecutive_failures: u32) -> Duration {
    let exp = consecutive_failures.min(8);
    Duration::from_secs(1 << exp).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    use mostrador_catalog::{Category, Product};
    use mostrador_core::ProductId;
    use mostrador_store::LocalStore;

    use crate::remote::RemoteError;

    struct UnreachableRemote;

    impl RemoteInventory for UnreachableRemote {
        async fn fetch_categories(&self) -> Result<Vec<Category>, RemoteError> {
            Err(RemoteError::Unreachable("down".into()))
        }

        async fn fetch_products(&self) -> Result<Vec<Product>, RemoteError> {
            Err(RemoteError::Unreachable("down".into()))
        }

        async fn fetch_product(&self, _id: &ProductId) -> Result<Product, RemoteError> {
            Err(RemoteError::Unreachable("down".into()))
        }

        async fn update_product(&self, _product: &Product) -> Result<(), RemoteError> {
            Err(RemoteError::Unreachable("down".into()))
        }

        async fn login(
            &self,
            _username: &str,
            _password: &str,
        ) -> Result<crate::types::Vendor, RemoteError> {
            Err(RemoteError::Unreachable("down".into()))
        }

        async fn ping(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn shutdown_stops_the_worker() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let ctx = Arc::new(AppContext::new(store, UnreachableRemote));

        let worker = SyncWorker::new(ctx).with_probe_interval(Duration::from_millis(10));
        let shutdown = worker.shutdown_handle();
        let handle = worker.start();

        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }

    #[test]
    fn backoff_is_capped() {
        assert_eq!(backoff_for(1), Duration::from_secs(2));
        assert_eq!(backoff_for(3), Duration::from_secs(8));
        assert_eq!(backoff_for(20), MAX_BACKOFF);
    }
}
