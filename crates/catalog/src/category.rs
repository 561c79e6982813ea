use serde::{Deserialize, Serialize};

use mostrador_core::CategoryId;

/// Product category, read-only from the client's perspective.
///
/// Used only to label and filter products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub active: bool,
}
