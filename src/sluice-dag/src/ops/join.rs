//! Binary operators: equi-join and cartesian product.

use serde::{Deserialize, Serialize};

fn default_num_keys() -> usize {
    1
}

/// Equi-join on the first `num_keys` fields of both inputs.
///
/// Output is the keys followed by the remaining left fields and then the
/// remaining right fields, named positionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOp {
    #[serde(default = "default_num_keys")]
    pub num_keys: usize,
}

impl JoinOp {
    pub fn new(num_keys: usize) -> Self {
        Self { num_keys }
    }
}

impl Default for JoinOp {
    fn default() -> Self {
        Self {
            num_keys: default_num_keys(),
        }
    }
}

impl std::fmt::Display for JoinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "num_keys={}", self.num_keys)
    }
}

/// Cartesian product: left fields followed by right fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartesianOp {}
