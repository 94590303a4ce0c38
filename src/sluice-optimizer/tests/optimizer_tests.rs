//! Integration tests for sluice-optimizer

use common_config::SluiceConfig;
use proptest::prelude::*;
use sluice_core::{AtomicKind, FieldType, TupleType};
use sluice_dag::{Dag, Expr, OperatorKind};
use sluice_optimizer::{Optimizer, optimize};

fn pair() -> TupleType {
    TupleType::positional([
        FieldType::atomic(AtomicKind::Int64),
        FieldType::atomic(AtomicKind::Int64),
    ])
}

#[derive(Debug, Clone)]
enum Step {
    Filter(usize, i64),
    Reverse,
}

/// Two inputs combined by a join or a cartesian product, followed by filters
/// and order-reversing projections.
fn arb_plan() -> impl Strategy<Value = Dag> {
    (
        any::<bool>(),
        proptest::collection::vec(
            prop_oneof![
                3 => (0usize..3, -5i64..5).prop_map(|(i, k)| Step::Filter(i, k)),
                1 => Just(Step::Reverse),
            ],
            0..6,
        ),
    )
        .prop_map(|(use_join, steps)| {
            let mut dag = Dag::new();
            let left = dag.add_operator(OperatorKind::parameter_lookup(0, pair()));
            let right = dag.add_operator(OperatorKind::parameter_lookup(1, pair()));
            let product = if use_join {
                dag.add_operator(OperatorKind::join(1))
            } else {
                dag.add_operator(OperatorKind::cartesian())
            };
            dag.add_edge(left, 0, product, 0).unwrap();
            dag.add_edge(right, 0, product, 1).unwrap();

            let width = if use_join { 3 } else { 4 };
            let mut last = product;
            for step in steps {
                let kind = match step {
                    Step::Filter(i, k) => OperatorKind::filter(Expr::field(i % width).gt(Expr::int(k))),
                    Step::Reverse => OperatorKind::projection((0..width).rev().collect::<Vec<_>>()),
                };
                let next = dag.add_operator(kind);
                dag.add_edge(last, 0, next, 0).unwrap();
                last = next;
            }
            let sink = dag.add_operator(OperatorKind::materialize_row_vector());
            dag.add_edge(last, 0, sink, 0).unwrap();
            dag.set_sink(sink).unwrap();
            dag
        })
}

#[test]
fn test_filter_ends_below_join() {
    let dag = Dag::from_json(
        r#"{"dag": [
            {"id": 0, "op": "parameter_lookup", "parameter_num": 0,
             "output_type": [{"name": "k", "type": {"atomic": "int64"}},
                             {"name": "a", "type": {"atomic": "int64"}}]},
            {"id": 1, "op": "parameter_lookup", "parameter_num": 1,
             "output_type": [{"name": "k", "type": {"atomic": "int64"}},
                             {"name": "b", "type": {"atomic": "float64"}}]},
            {"id": 2, "op": "join", "predecessors": [0, 1]},
            {"id": 3, "op": "projection", "predecessors": [2], "positions": [2, 1]},
            {"id": 4, "op": "filter", "predecessors": [3],
             "predicate": {"binary": {"op": "gt",
                "left": {"field": {"arg": 0, "index": 0}},
                "right": {"literal": {"float": 0.5}}}}},
            {"id": 5, "op": "materialize_row_vector", "predecessors": [4]}
        ]}"#,
    )
    .unwrap();

    let optimized = optimize(&dag).unwrap();
    // projection -> join -> right input, landing on the float column.
    assert_eq!(optimized.predecessor(4, 0), Some(1));
    assert_eq!(optimized.predecessor(2, 1), Some(4));
    assert_eq!(optimized.predecessor(5, 0), Some(3));
    assert_eq!(
        optimized.operator(4).unwrap().kind,
        OperatorKind::filter(Expr::field(1).gt(Expr::float(0.5)))
    );
}

#[test]
fn test_config_selects_rules() {
    let config = SluiceConfig::from_json_str(r#"{"optimizer": {"level": 0}}"#).unwrap();
    let optimizer = Optimizer::from_settings(&config.optimizer);
    assert!(optimizer.rule_names().is_empty());

    let config = SluiceConfig::default().with_optimization_level(2);
    let optimizer = Optimizer::from_settings(&config.optimizer);
    assert_eq!(
        optimizer.rule_names(),
        vec!["PredicatePushdown", "ProjectionFusion"]
    );
}

#[test]
fn test_invalid_input_rejected() {
    let mut dag = Dag::new();
    dag.add_operator(OperatorKind::filter(Expr::bool(true)));
    assert!(optimize(&dag).is_err());
}

proptest! {
    #[test]
    fn test_optimizer_is_idempotent(dag in arb_plan()) {
        let optimizer = Optimizer::for_level(2);
        let first = optimizer.optimize(&dag).unwrap();
        first.dag.validate().unwrap();

        let second = optimizer.optimize(&first.dag).unwrap();
        prop_assert_eq!(second.rules_applied, 0);
        prop_assert_eq!(&second.dag, &first.dag);
    }

    #[test]
    fn test_no_filter_left_above_product(dag in arb_plan()) {
        let optimized = Optimizer::for_level(1).optimize(&dag).unwrap().dag;
        // Single-column filters always find a side.
        for op in optimized.operators() {
            if let OperatorKind::Filter(_) = op.kind {
                let producer = optimized.predecessor(op.id, 0).unwrap();
                let kind = &optimized.operator(producer).unwrap().kind;
                prop_assert!(
                    !matches!(kind, OperatorKind::Join(_) | OperatorKind::Cartesian(_) | OperatorKind::Projection(_)),
                    "filter {} still above {}", op.id, kind.tag()
                );
            }
        }
    }
}
