//! Application context: the explicit, constructed-once replacement for a
//! global mutable singleton.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use mostrador_store::{LocalStore, StoreError};

use crate::catalog_sync::CatalogSync;
use crate::checkout::CheckoutEngine;
use crate::connectivity::ConnectivityMonitor;
use crate::reconcile::Reconciler;
use crate::remote::{RemoteError, RemoteInventory};
use crate::session::SessionTracker;
use crate::types::Vendor;

/// Everything the core engines share, with clearly scoped lifetime.
///
/// Constructed once at startup; each engine borrows exactly what it
/// needs. The user-interface adapter owns its own `Cart` and translates
/// events into calls on the engines built from here.
pub struct AppContext<R> {
    store: LocalStore,
    remote: R,
    connectivity: ConnectivityMonitor,
    vendor: Mutex<Option<Vendor>>,
}

impl<R: RemoteInventory> AppContext<R> {
    pub fn new(store: LocalStore, remote: R) -> Self {
        Self {
            store,
            remote,
            connectivity: ConnectivityMonitor::new(),
            vendor: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// The currently authenticated vendor, if any.
    pub fn vendor(&self) -> Option<Vendor> {
        self.vendor.lock().unwrap().clone()
    }

    /// Authenticate against the remote service and record the vendor
    /// identity that keys the local sale tables.
    pub async fn login(&self, username: &str, password: &str) -> Result<Vendor, RemoteError> {
        let vendor = self.remote.login(username, password).await?;
        tracing::info!(vendor = %vendor.id, "vendor signed in");
        *self.vendor.lock().unwrap() = Some(vendor.clone());
        Ok(vendor)
    }

    pub fn sign_out(&self) {
        *self.vendor.lock().unwrap() = None;
    }

    /// Record a tracked user interaction.
    pub async fn touch(&self, now: DateTime<Utc>) -> Result<(), StoreError> {
        SessionTracker::new(&self.store).touch(now).await
    }

    /// Expire the session when idle past the window.
    ///
    /// Clears the vendor identity and the persisted cart record, but never
    /// the pending/completed sale tables. Returns whether expiry happened;
    /// the caller drops its in-memory cart on `true`.
    pub async fn expire_if_idle(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let Some(vendor) = self.vendor() else {
            return Ok(false);
        };

        if !SessionTracker::new(&self.store).expired(now).await? {
            return Ok(false);
        }

        tracing::info!(vendor = %vendor.id, "session expired after inactivity");
        self.store.clear_cart(&vendor.id).await?;
        self.sign_out();
        Ok(true)
    }

    pub fn catalog_sync(&self) -> CatalogSync<'_, R> {
        CatalogSync::new(&self.remote, &self.store)
    }

    pub fn reconciler(&self) -> Reconciler<'_, R> {
        Reconciler::new(&self.remote, &self.store, &self.connectivity)
    }

    pub fn checkout_engine(&self) -> CheckoutEngine<'_, R> {
        CheckoutEngine::new(&self.remote, &self.store, &self.connectivity)
    }

    /// Pending-sale count for the visible indicator.
    pub async fn pending_count(&self) -> Result<u64, StoreError> {
        match self.vendor() {
            Some(vendor) => self.store.pending_count(&vendor.id).await,
            None => Ok(0),
        }
    }
}
