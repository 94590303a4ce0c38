//! Row scan over a materialized array.

use serde::{Deserialize, Serialize};

/// Row scan - emits every element of the array in field 0 of each input
/// tuple, optionally prefixed with its index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowScanOp {
    #[serde(default)]
    pub add_index: bool,
}

impl RowScanOp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index() -> Self {
        Self { add_index: true }
    }
}

impl std::fmt::Display for RowScanOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "add_index={}", self.add_index)
    }
}
