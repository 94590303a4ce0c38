//! Operator catalog.
//!
//! Every operator kind is a variant of the closed [`OperatorKind`] enum with
//! its own configuration struct. Schema inference, traversal, evaluation and
//! code emission all dispatch on this enum with exhaustive matches.

mod filter;
mod group_by;
mod join;
mod map;
mod materialize;
mod partition;
mod pipeline;
mod projection;
mod reduce;
mod row_scan;
mod source;

pub use filter::FilterOp;
pub use group_by::{AggregateExpr, AggregateFunc, GroupByOp};
pub use join::{CartesianOp, JoinOp};
pub use map::MapOp;
pub use materialize::{EnsureSingleTupleOp, MaterializeRowVectorOp};
pub use partition::PartitionOp;
pub use pipeline::PipelineOp;
pub use projection::ProjectionOp;
pub use reduce::{ReduceByKeyOp, ReduceOp};
pub use row_scan::RowScanOp;
pub use source::{ConstantTupleOp, ParameterLookupOp, RangeOp};

use common_error::SluiceResult;
use sluice_core::TupleType;

use crate::dag::Dag;
use crate::expr::{Expr, Literal};

/// Operator kind together with its configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorKind {
    Range(RangeOp),
    ConstantTuple(ConstantTupleOp),
    ParameterLookup(ParameterLookupOp),
    RowScan(RowScanOp),
    Filter(FilterOp),
    Map(MapOp),
    Projection(ProjectionOp),
    Reduce(ReduceOp),
    ReduceByKey(ReduceByKeyOp),
    GroupBy(GroupByOp),
    Join(JoinOp),
    Cartesian(CartesianOp),
    Partition(PartitionOp),
    MaterializeRowVector(MaterializeRowVectorOp),
    EnsureSingleTuple(EnsureSingleTupleOp),
    Pipeline(PipelineOp),
}

impl OperatorKind {
    /// Stable wire tag of this kind.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Range(_) => "range",
            Self::ConstantTuple(_) => "constant_tuple",
            Self::ParameterLookup(_) => "parameter_lookup",
            Self::RowScan(_) => "row_scan",
            Self::Filter(_) => "filter",
            Self::Map(_) => "map",
            Self::Projection(_) => "projection",
            Self::Reduce(_) => "reduce",
            Self::ReduceByKey(_) => "reduce_by_key",
            Self::GroupBy(_) => "group_by",
            Self::Join(_) => "join",
            Self::Cartesian(_) => "cartesian",
            Self::Partition(_) => "partition",
            Self::MaterializeRowVector(_) => "materialize_row_vector",
            Self::EnsureSingleTuple(_) => "ensure_single_tuple",
            Self::Pipeline(_) => "pipeline",
        }
    }

    /// Number of input ports.
    pub fn num_in_ports(&self) -> usize {
        match self {
            Self::Range(_) | Self::ConstantTuple(_) | Self::ParameterLookup(_) => 0,
            Self::RowScan(_)
            | Self::Filter(_)
            | Self::Map(_)
            | Self::Projection(_)
            | Self::Reduce(_)
            | Self::ReduceByKey(_)
            | Self::GroupBy(_)
            | Self::Partition(_)
            | Self::MaterializeRowVector(_)
            | Self::EnsureSingleTuple(_) => 1,
            Self::Join(_) | Self::Cartesian(_) => 2,
            Self::Pipeline(p) => p.num_inputs,
        }
    }

    /// Number of output ports.
    pub const fn num_out_ports(&self) -> usize {
        1
    }

    pub const fn is_source(&self) -> bool {
        matches!(
            self,
            Self::Range(_) | Self::ConstantTuple(_) | Self::ParameterLookup(_)
        )
    }

    /// Check configuration constraints that serde cannot express.
    pub fn validate_config(&self) -> SluiceResult<()> {
        match self {
            Self::Range(op) => op.validate(),
            Self::Partition(op) => op.validate(),
            _ => Ok(()),
        }
    }

    /// The nested DAG of a pipeline.
    pub fn inner_dag(&self) -> Option<&Dag> {
        match self {
            Self::Pipeline(p) => Some(&p.inner_dag),
            _ => None,
        }
    }

    pub fn inner_dag_mut(&mut self) -> Option<&mut Dag> {
        match self {
            Self::Pipeline(p) => Some(&mut p.inner_dag),
            _ => None,
        }
    }

    // Convenience constructors

    pub fn range(from: i64, to: i64, step: i64) -> SluiceResult<Self> {
        RangeOp::new(from, to, step).map(Self::Range)
    }

    pub fn constant_tuple(values: Vec<Literal>) -> Self {
        Self::ConstantTuple(ConstantTupleOp::new(values))
    }

    pub fn parameter_lookup(parameter_num: usize, output_type: TupleType) -> Self {
        Self::ParameterLookup(ParameterLookupOp::new(parameter_num, output_type))
    }

    pub fn pipeline_input(parameter_num: usize) -> Self {
        Self::ParameterLookup(ParameterLookupOp::pipeline_input(parameter_num))
    }

    pub fn row_scan(add_index: bool) -> Self {
        Self::RowScan(RowScanOp { add_index })
    }

    pub fn filter(predicate: Expr) -> Self {
        Self::Filter(FilterOp::new(predicate))
    }

    pub fn map(func: Expr) -> Self {
        Self::Map(MapOp::new(func))
    }

    pub fn projection(positions: impl Into<Vec<usize>>) -> Self {
        Self::Projection(ProjectionOp::new(positions))
    }

    pub fn reduce(func: Expr) -> Self {
        Self::Reduce(ReduceOp::new(func))
    }

    pub fn reduce_by_key(func: Expr) -> Self {
        Self::ReduceByKey(ReduceByKeyOp::new(func))
    }

    pub fn join(num_keys: usize) -> Self {
        Self::Join(JoinOp::new(num_keys))
    }

    pub fn cartesian() -> Self {
        Self::Cartesian(CartesianOp {})
    }

    pub fn partition(num_partitions: usize) -> SluiceResult<Self> {
        PartitionOp::new(num_partitions).map(Self::Partition)
    }

    pub fn materialize_row_vector() -> Self {
        Self::MaterializeRowVector(MaterializeRowVectorOp {})
    }

    pub fn ensure_single_tuple() -> Self {
        Self::EnsureSingleTuple(EnsureSingleTupleOp {})
    }

    pub fn pipeline(num_inputs: usize, inner_dag: Dag) -> Self {
        Self::Pipeline(PipelineOp::new(num_inputs, inner_dag))
    }
}

impl std::fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = self.tag();
        match self {
            Self::Range(op) => write!(f, "{tag}({op})"),
            Self::ConstantTuple(op) => write!(f, "{tag}({op})"),
            Self::ParameterLookup(op) => write!(f, "{tag}({op})"),
            Self::RowScan(op) => write!(f, "{tag}({op})"),
            Self::Filter(op) => write!(f, "{tag}({op})"),
            Self::Map(op) => write!(f, "{tag}({op})"),
            Self::Projection(op) => write!(f, "{tag}({op})"),
            Self::Reduce(op) => write!(f, "{tag}({op})"),
            Self::ReduceByKey(op) => write!(f, "{tag}({op})"),
            Self::GroupBy(op) => write!(f, "{tag}({op})"),
            Self::Join(op) => write!(f, "{tag}({op})"),
            Self::Partition(op) => write!(f, "{tag}({op})"),
            Self::Pipeline(op) => write!(f, "{tag}({op})"),
            Self::Cartesian(_) | Self::MaterializeRowVector(_) | Self::EnsureSingleTuple(_) => {
                f.write_str(tag)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports() {
        assert_eq!(OperatorKind::range(0, 1, 1).unwrap().num_in_ports(), 0);
        assert_eq!(OperatorKind::filter(Expr::bool(true)).num_in_ports(), 1);
        assert_eq!(OperatorKind::join(1).num_in_ports(), 2);
        assert_eq!(OperatorKind::cartesian().num_in_ports(), 2);
        assert_eq!(OperatorKind::pipeline(3, Dag::new()).num_in_ports(), 3);
        assert_eq!(OperatorKind::cartesian().num_out_ports(), 1);
    }

    #[test]
    fn test_tags() {
        assert_eq!(OperatorKind::materialize_row_vector().tag(), "materialize_row_vector");
        assert_eq!(OperatorKind::partition(2).unwrap().tag(), "partition");
        assert!(OperatorKind::pipeline_input(0).is_source());
        assert!(!OperatorKind::row_scan(false).is_source());
    }

    #[test]
    fn test_display() {
        let op = OperatorKind::range(0, 5, 1).unwrap();
        assert_eq!(op.to_string(), "range(from=0, to=5, step=1)");
        assert_eq!(OperatorKind::cartesian().to_string(), "cartesian");
    }

    #[test]
    fn test_validate_config() {
        let bad = OperatorKind::Range(RangeOp {
            from: 0,
            to: 1,
            step: 0,
        });
        assert!(bad.validate_config().is_err());
        assert!(OperatorKind::join(2).validate_config().is_ok());
    }
}
