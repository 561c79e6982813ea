//! `mostrador-store`
//!
//! **Responsibility:** Durable, structured, asynchronous local persistence.
//!
//! The local store is the only shared mutable resource across components.
//! Every operation is a single, self-contained request/response round trip;
//! no component holds a long-lived open transaction. It survives page
//! reloads and offline periods, and never touches the network.

pub mod error;
mod schema;
pub mod store;

pub use error::StoreError;
pub use store::LocalStore;
