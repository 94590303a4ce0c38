//! Filter operator for predicate-based filtering.

use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// Filter operator - keeps tuples for which the predicate holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOp {
    /// Filter predicate (must evaluate to bool).
    pub predicate: Expr,
}

impl FilterOp {
    /// Create a new filter operation.
    pub fn new(predicate: Expr) -> Self {
        Self { predicate }
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.predicate)
    }
}
