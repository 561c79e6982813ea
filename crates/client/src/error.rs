//! Error types at the sync and checkout seams.

use thiserror::Error;

use mostrador_core::ProductId;
use mostrador_sales::CartError;
use mostrador_store::StoreError;

use crate::remote::RemoteError;

/// Failures during catalog sync or reconciliation.
///
/// Remote failures are recoverable: the replica falls back to the cached
/// copy and queued sales wait for the next trigger. Store failures
/// propagate; only `StoreError::Unavailable` is fatal to the session.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A queued line's deduction would drive remote stock negative.
    /// Surfaced for seller/owner intervention instead of silently
    /// clamping to zero.
    #[error("insufficient remote stock for {product}: available {available}, requested {requested}")]
    InsufficientRemoteStock {
        product: ProductId,
        available: i64,
        requested: u32,
    },
}

/// Failures during checkout.
///
/// Remote failures deliberately do not appear here: the online path
/// degrades to queueing the sale instead of failing the checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
