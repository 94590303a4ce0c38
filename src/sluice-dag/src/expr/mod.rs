//! Expression language for operator functions.
//!
//! Filters, maps and reductions carry a small typed expression tree instead
//! of opaque code. Expressions infer their type against the argument tuple
//! types, render to C++ for code generation, and evaluate over `Value`s for
//! the reference evaluator.

mod binary;
#[allow(clippy::module_inception)]
mod expr;

pub use binary::{BinaryOp, UnaryOp};
pub use expr::{Expr, Literal};
