//! Process-wide tracing setup shared by the client binaries and tests.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::{init, init_json};
