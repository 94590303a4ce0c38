//! Query optimizer for Sluice operator DAGs.
//!
//! Provides rule-based rewrites selected by optimization level.

mod rules;

pub use rules::{
    OptimizationRule, OptimizedDag, Optimizer, OptimizerConfig, PredicatePushdown,
    ProjectionFusion, RuleTrace, Transformed, apply_rule, rules_for_level,
};

use common_error::SluiceResult;
use sluice_dag::Dag;

/// Optimize a DAG using the default optimizer.
pub fn optimize(dag: &Dag) -> SluiceResult<Dag> {
    let optimizer = Optimizer::default();
    optimizer.optimize(dag).map(|result| result.dag)
}
