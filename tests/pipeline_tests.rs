//! End-to-end tests across the workspace crates: optimization must never
//! change what a DAG computes.

use sluice::codegen::generate;
use sluice::core::Value;
use sluice::dag::{Dag, Expr, OperatorKind};
use sluice::optimizer::Optimizer;
use sluice::runtime::{EvaluatedPlan, PlanRegistry, Rows, register_plan};

/// `range(0, a) x range(0, b)`, swapped by a projection, filtered on the
/// right range and narrowed by two stacked projections.
fn product_dag(a: i64, b: i64, k: i64) -> Dag {
    let mut dag = Dag::new();
    let left = dag.add_operator(OperatorKind::range(0, a, 1).unwrap());
    let right = dag.add_operator(OperatorKind::range(0, b, 1).unwrap());
    let product = dag.add_operator(OperatorKind::cartesian());
    let swap = dag.add_operator(OperatorKind::projection([1, 0]));
    let filter = dag.add_operator(OperatorKind::filter(Expr::field(0).gt(Expr::int(k))));
    let narrow = dag.add_operator(OperatorKind::projection([1, 0]));
    let first = dag.add_operator(OperatorKind::projection([0]));
    dag.add_edge(left, 0, product, 0).unwrap();
    dag.add_edge(right, 0, product, 1).unwrap();
    dag.add_edge(product, 0, swap, 0).unwrap();
    dag.add_edge(swap, 0, filter, 0).unwrap();
    dag.add_edge(filter, 0, narrow, 0).unwrap();
    dag.add_edge(narrow, 0, first, 0).unwrap();
    dag.set_sink(first).unwrap();
    dag
}

fn evaluate(dag: &Dag) -> Rows {
    let mut rows = EvaluatedPlan::new(dag.clone()).unwrap().evaluate(&[]).unwrap();
    rows.sort_by_key(|row| Value::Tuple(row.clone()).to_string());
    rows
}

#[test]
fn test_every_level_preserves_results() {
    let dag = product_dag(4, 6, 2);
    let expected = evaluate(&dag);
    // Left values 0..4, each paired with right values 3, 4, 5.
    assert_eq!(expected.len(), 12);

    for level in 0..=2 {
        let optimized = Optimizer::for_level(level).optimize(&dag).unwrap();
        assert_eq!(evaluate(&optimized.dag), expected, "level {level}");
        // The optimized DAG still compiles.
        assert!(generate(&optimized.dag).is_ok(), "level {level}");
    }
}

#[test]
fn test_optimization_is_idempotent() {
    let dag = product_dag(3, 3, 0);
    let optimizer = Optimizer::for_level(2);
    let once = optimizer.optimize(&dag).unwrap();
    assert!(once.rules_applied > 0);
    let twice = optimizer.optimize(&once.dag).unwrap();
    assert_eq!(twice.rules_applied, 0);
    assert_eq!(twice.dag.to_json().unwrap(), once.dag.to_json().unwrap());
}

#[test]
fn test_optimized_plan_through_registry() {
    let dag = Optimizer::for_level(2)
        .optimize(&product_dag(2, 4, 2))
        .unwrap()
        .dag;
    let registry = PlanRegistry::new();
    let id = register_plan(&registry, dag).unwrap();
    assert_eq!(registry.execute(id, "[]").unwrap(), "[[0],[1]]");
}
