//! Projection fusion optimization rule.

use common_error::{SluiceError, SluiceResult};
use sluice_dag::ops::ProjectionOp;
use sluice_dag::{Dag, OperatorId, OperatorKind};

use super::OptimizationRule;
use super::rule::Transformed;

/// Collapses a projection over a projection into a single projection.
///
/// The inner projection is removed when the outer one is its only consumer.
pub struct ProjectionFusion;

impl OptimizationRule for ProjectionFusion {
    fn name(&self) -> &'static str {
        "ProjectionFusion"
    }

    fn description(&self) -> &'static str {
        "Collapse stacked projections"
    }

    fn apply(&self, dag: &mut Dag) -> SluiceResult<Transformed> {
        let mut changed = false;
        while fuse_one(dag)? {
            changed = true;
        }
        Ok(changed.into())
    }
}

fn fuse_one(dag: &mut Dag) -> SluiceResult<bool> {
    if let Some((outer, inner, fused)) = find_fusion(dag) {
        let source = dag.predecessor(inner, 0).ok_or_else(|| {
            SluiceError::internal(format!("projection {inner} has no input"))
        })?;
        dag.remove_edge(outer, 0);
        dag.remove_edge(inner, 0);
        dag.remove_operator(inner)?;
        dag.add_edge(source, 0, outer, 0)?;
        if let Some(op) = dag.operator_mut(outer) {
            op.kind = OperatorKind::Projection(fused);
        }
        log::debug!("fused projection {inner} into projection {outer}");
        return Ok(true);
    }
    for id in dag.operator_ids() {
        if let Some(inner_dag) = dag.inner_dag_mut(id) {
            if fuse_one(inner_dag)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn find_fusion(dag: &Dag) -> Option<(OperatorId, OperatorId, ProjectionOp)> {
    dag.operators().find_map(|op| {
        let OperatorKind::Projection(outer) = &op.kind else {
            return None;
        };
        let inner_id = dag.predecessor(op.id, 0)?;
        let OperatorKind::Projection(inner) = &dag.operator(inner_id)?.kind else {
            return None;
        };
        if dag.out_flows(inner_id).len() != 1 || dag.sink() == Some(inner_id) {
            return None;
        }
        inner.then(outer).map(|fused| (op.id, inner_id, fused))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::{AtomicKind, FieldType, TupleType};

    fn triple() -> TupleType {
        TupleType::positional([
            FieldType::atomic(AtomicKind::Int64),
            FieldType::atomic(AtomicKind::Float64),
            FieldType::atomic(AtomicKind::Bool),
        ])
    }

    #[test]
    fn test_fuse_chain() {
        let mut dag = Dag::new();
        let src = dag.add_operator(OperatorKind::parameter_lookup(0, triple()));
        let p1 = dag.add_operator(OperatorKind::projection([2, 0, 1]));
        let p2 = dag.add_operator(OperatorKind::projection([2, 1]));
        let p3 = dag.add_operator(OperatorKind::projection([1]));
        dag.add_edge(src, 0, p1, 0).unwrap();
        dag.add_edge(p1, 0, p2, 0).unwrap();
        dag.add_edge(p2, 0, p3, 0).unwrap();
        dag.set_sink(p3).unwrap();

        assert!(ProjectionFusion.apply(&mut dag).unwrap().changed);
        assert_eq!(dag.len(), 2);
        assert_eq!(dag.predecessor(p3, 0), Some(src));
        // p2 selects (v1, v0) of the source, p3 keeps the second of those.
        assert_eq!(
            dag.operator(p3).unwrap().kind,
            OperatorKind::projection([0])
        );
        dag.validate().unwrap();
        assert!(!ProjectionFusion.apply(&mut dag).unwrap().changed);
    }

    #[test]
    fn test_shared_inner_projection_kept() {
        let mut dag = Dag::new();
        let src = dag.add_operator(OperatorKind::parameter_lookup(0, triple()));
        let p1 = dag.add_operator(OperatorKind::projection([0, 1]));
        let p2 = dag.add_operator(OperatorKind::projection([0]));
        let other = dag.add_operator(OperatorKind::cartesian());
        dag.add_edge(src, 0, p1, 0).unwrap();
        dag.add_edge(p1, 0, p2, 0).unwrap();
        dag.add_edge(p2, 0, other, 0).unwrap();
        dag.add_edge(p1, 0, other, 1).unwrap();
        dag.set_sink(other).unwrap();

        assert!(!ProjectionFusion.apply(&mut dag).unwrap().changed);
        assert_eq!(dag.len(), 4);
    }
}
