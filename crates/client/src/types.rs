//! Shared types used across the sync subsystem.

use serde::{Deserialize, Serialize};

use mostrador_core::VendorId;
use mostrador_sales::Sale;

/// Connectivity state of the client, as shown by the sync indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Online and reachable.
    #[default]
    Online,
    /// Offline (network unreachable or remote service unavailable).
    Offline,
    /// A sync or reconciliation run is in progress.
    Syncing,
}

/// The authenticated seller operating this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
}

/// Result of a reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Sales confirmed against the remote service and moved to the
    /// completed table.
    pub synced: usize,
    /// Sales left queued for the next trigger.
    pub still_pending: usize,
}

/// How a checkout ended.
///
/// A sale is durably recorded in every variant; the distinction is which
/// table it landed in and why.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Online path: every line's stock deduction was confirmed remotely.
    Completed(Sale),
    /// Offline path: the sale is queued for reconciliation.
    QueuedOffline(Sale),
    /// Online path hit a remote failure mid-sale. The whole sale was
    /// queued as pending; lines already deducted keep their `applied`
    /// flag so reconciliation never deducts them twice. Never silent.
    QueuedAfterRemoteFailure {
        sale: Sale,
        applied_lines: usize,
        error: String,
    },
}

impl CheckoutOutcome {
    pub fn sale(&self) -> &Sale {
        match self {
            Self::Completed(sale)
            | Self::QueuedOffline(sale)
            | Self::QueuedAfterRemoteFailure { sale, .. } => sale,
        }
    }
}
