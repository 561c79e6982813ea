//! `mostrador-catalog`
//!
//! **Responsibility:** The locally cached product/category replica.
//!
//! The remote inventory service owns these records; the client holds a
//! possibly stale copy that is replaced wholesale on every catalog refresh.
//! Adjusted-stock math lives here so the sync layer stays thin.

pub mod category;
pub mod product;

pub use category::Category;
pub use product::{Product, ProductIndex, apply_demand};
