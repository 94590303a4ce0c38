//! Map operator.

use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// Map operator - applies a function to every tuple.
///
/// A function returning a tuple defines the output type directly; a scalar
/// result is wrapped as `{v0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOp {
    pub func: Expr,
}

impl MapOp {
    pub fn new(func: Expr) -> Self {
        Self { func }
    }
}

impl std::fmt::Display for MapOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.func)
    }
}
