//! `mostrador-sales`
//!
//! **Responsibility:** The in-memory cart and the sale lifecycle.
//!
//! Everything here is pure: cart manipulation, stock-aware quantity
//! validation and sale construction take the known catalog as input and
//! return values or errors. Persistence and the online/offline decision
//! live in `mostrador-client`.

pub mod cart;
pub mod sale;

pub use cart::{Cart, CartError, CartLine};
pub use sale::{Sale, SaleLine, SaleStatus, pending_demand};
