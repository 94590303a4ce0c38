//! Collection-level operators.

use serde::{Deserialize, Serialize};

/// Materialize row vector - collects all input tuples into a single
/// `{v0: array<input>}` tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeRowVectorOp {}

/// Ensure single tuple - passes its input through, failing at run time
/// unless the input holds exactly one tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureSingleTupleOp {}
