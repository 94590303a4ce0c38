//! The callable plan abstraction.

use common_error::SluiceResult;
use sluice_core::{Tuple, TupleType, Value};

/// Identifier of a registered plan. Ids are handed out in registration
/// order, starting at 0.
pub type PlanId = usize;

/// A compiled plan that can be executed by id.
///
/// Plans are immutable once registered and every execution owns its inputs
/// and result, so one plan may run on several threads at the same time.
pub trait Plan: Send + Sync {
    /// Declared type of each plan input, indexed by parameter number.
    fn input_types(&self) -> &[TupleType];

    /// Run the plan. Each result element is a `Value::Tuple`.
    fn execute(&self, inputs: &[Tuple]) -> SluiceResult<Vec<Value>>;
}
