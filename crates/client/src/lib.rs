//! `mostrador-client`
//!
//! **Responsibility:** The offline-first synchronization core of the
//! point-of-sale client.
//!
//! This crate provides:
//! - The remote inventory service client (HTTP) behind a narrow trait
//! - Connectivity tracking with a tri-state sync indicator
//! - Catalog sync that adjusts remote stock for locally queued demand
//! - Checkout orchestration (online and offline paths)
//! - The reconciliation engine that drains the pending-sale queue
//! - Session inactivity expiry and a background sync worker
//!
//! No rendering surface lives here: every operation is an explicit call
//! with a return value, testable without any user interface.

pub mod catalog_sync;
pub mod checkout;
pub mod connectivity;
pub mod context;
pub mod error;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod types;
pub mod worker;

pub use catalog_sync::CatalogSync;
pub use checkout::CheckoutEngine;
pub use connectivity::{ConnectivityMonitor, SyncGuard};
pub use context::AppContext;
pub use error::{CheckoutError, SyncError};
pub use reconcile::Reconciler;
pub use remote::{HttpRemote, RemoteError, RemoteInventory};
pub use session::SessionTracker;
pub use types::{CheckoutOutcome, Connectivity, SyncReport, Vendor};
pub use worker::SyncWorker;
