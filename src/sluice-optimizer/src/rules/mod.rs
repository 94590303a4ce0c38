//! Optimization rules for Sluice operator DAGs.
//!
//! This module provides the rewrite rules that transform DAGs while
//! preserving the tuples they produce.
//!
//! # Rule Categories
//!
//! - **Predicate Pushdown**: Move filters closer to the inputs
//! - **Projection Fusion**: Collapse stacked projections
//!
//! # Rewrite Safety
//!
//! A rewrite is **legal** if and only if all of the following hold:
//!
//! 1. **Tuple Preservation**: The multiset of tuples reaching the sink is identical
//! 2. **Column Preservation**: A filter only moves to an input that carries
//!    every column its predicate reads
//! 3. **Sharing Preservation**: An operator read by several consumers is never
//!    rewritten on behalf of one of them

mod optimizer;
mod predicate_pushdown;
mod projection_fusion;
mod rule;

pub use optimizer::{Optimizer, OptimizerConfig, apply_rule, rules_for_level};
pub use predicate_pushdown::PredicatePushdown;
pub use projection_fusion::ProjectionFusion;
pub use rule::{OptimizationRule, OptimizedDag, RuleTrace, Transformed};
