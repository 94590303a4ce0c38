//! Operator DAG for the Sluice dataflow compiler.
//!
//! This crate provides the intermediate representation every later stage
//! works on:
//! - `Dag`, `DagOperator` and `Edge` for the graph structure
//! - `OperatorKind` and its configuration structs for the operator catalog
//! - `Expr` for typed operator functions
//! - JSON wire format and `OperatorRegistry` for parsing
//! - schema inference, column annotation and liveness
//! - the traversal engine and `explain` rendering
//!
//! # Architecture
//!
//! ```text
//! JSON document ──▶ OperatorRegistry ──▶ Dag ──▶ validate ──▶ annotate
//!                                         │
//!                                         ▼
//!                               traverse / explain / to_json
//! ```

#![allow(clippy::module_name_repetitions)] // DagOperator, DagTypes read better than Operator, Types

pub mod annotate;
pub mod dag;
pub mod explain;
pub mod expr;
pub mod ops;
pub mod registry;
pub mod schema_inference;
pub mod traversal;
mod validation;
mod wire;

pub use annotate::annotate;
pub use dag::{Dag, DagOperator, Edge, Flow, OperatorId};
pub use explain::explain;
pub use expr::{BinaryOp, Expr, Literal, UnaryOp};
pub use ops::OperatorKind;
pub use registry::{OperatorFactory, OperatorRegistry};
pub use schema_inference::{DagTypes, infer_output_type, infer_types, infer_types_with_inputs};
pub use traversal::{
    DagVisitor, Direction, apply_in_reverse_topological_order,
    apply_in_reverse_topological_order_recursively, apply_in_topological_order,
    apply_in_topological_order_recursively, order, topological_order, traverse,
};
