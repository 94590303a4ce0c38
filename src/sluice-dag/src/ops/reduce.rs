//! Reductions.

use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// Reduce - folds all input tuples into one with a two-argument function.
///
/// Argument 0 is the accumulator, argument 1 the next tuple; the function
/// must return a tuple of the input type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReduceOp {
    pub func: Expr,
}

impl ReduceOp {
    pub fn new(func: Expr) -> Self {
        Self { func }
    }
}

impl std::fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.func)
    }
}

/// Reduce by key - field 0 is the key; tuples with equal keys are folded
/// with a two-argument function over the remaining (value) fields.
///
/// Output tuples appear in first-seen key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReduceByKeyOp {
    pub func: Expr,
}

impl ReduceByKeyOp {
    pub fn new(func: Expr) -> Self {
        Self { func }
    }
}

impl std::fmt::Display for ReduceByKeyOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "key=0, {}", self.func)
    }
}
