//! Plan registry and reference evaluator.
//!
//! Compiled plans are registered once and then executed by id, from any
//! number of threads:
//!
//! ```text
//! Dag ──▶ EvaluatedPlan ──▶ PlanRegistry::register ──▶ PlanId
//! PlanId + JSON inputs ──▶ PlanRegistry::execute ──▶ JSON result
//! ```
//!
//! [`EvaluatedPlan`] runs a DAG directly over in-memory values with the same
//! per-operator semantics the generated C++ has, which makes it the oracle
//! for optimizer and code generator tests.

mod aggregate;
pub mod evaluate;
pub mod plan;
pub mod registry;

pub use evaluate::{EvaluatedPlan, Rows, evaluate_dag};
pub use plan::{Plan, PlanId};
pub use registry::{PlanRegistry, execute_plan, register_plan};
