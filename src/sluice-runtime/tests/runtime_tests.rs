//! Integration tests for sluice-runtime

use proptest::prelude::*;
use sluice_core::{AtomicKind, FieldType, TupleType};
use sluice_dag::ops::{AggregateExpr, GroupByOp};
use sluice_dag::{Dag, Expr, OperatorKind};
use sluice_runtime::{PlanRegistry, execute_plan, register_plan};

const SCENARIO_A: &str = r#"{"dag": [
    {"id": 0, "op": "range", "predecessors": [], "from": 0, "to": 5, "step": 1},
    {"id": 1, "op": "filter", "predecessors": [0],
     "predicate": {"binary": {"op": "gt",
       "left": {"field": {"arg": 0, "index": 0}},
       "right": {"literal": {"int": 2}}}}},
    {"id": 2, "op": "materialize_row_vector", "predecessors": [1]}
], "sink": 2}"#;

/// `{v0: array<{v0: int64, v1: float64}>}`, scanned into its rows.
fn scanned_rows(dag: &mut Dag, parameter_num: usize, value: FieldType) -> usize {
    let row = TupleType::positional([FieldType::atomic(AtomicKind::Int64), value]);
    let input = TupleType::positional([FieldType::array(FieldType::Tuple(row))]);
    let lookup = dag.add_operator(OperatorKind::parameter_lookup(parameter_num, input));
    let scan = dag.add_operator(OperatorKind::row_scan(false));
    dag.add_edge(lookup, 0, scan, 0).unwrap();
    scan
}

#[test]
fn test_scenario_a() {
    let registry = PlanRegistry::new();
    let id = register_plan(&registry, Dag::from_json(SCENARIO_A).unwrap()).unwrap();
    assert_eq!(id, 0);
    assert_eq!(execute_plan(&registry, id, "[]").unwrap(), "[[3],[4]]");
    // Plans are reusable.
    assert_eq!(execute_plan(&registry, id, "[]").unwrap(), "[[3],[4]]");
}

#[test]
fn test_scenario_b_pipeline() {
    let mut inner = Dag::new();
    let r = inner.add_operator(OperatorKind::range(0, 3, 1).unwrap());
    let m = inner.add_operator(OperatorKind::map(Expr::field(0).mul(Expr::int(2))));
    let s = inner.add_operator(OperatorKind::materialize_row_vector());
    inner.add_edge(r, 0, m, 0).unwrap();
    inner.add_edge(m, 0, s, 0).unwrap();
    inner.set_sink(s).unwrap();

    let mut dag = Dag::new();
    let pipeline = dag.add_operator(OperatorKind::pipeline(0, inner));
    dag.set_sink(pipeline).unwrap();

    let registry = PlanRegistry::new();
    let id = register_plan(&registry, dag).unwrap();
    assert_eq!(execute_plan(&registry, id, "[]").unwrap(), "[[0],[2],[4]]");
}

#[test]
fn test_join_over_json_inputs() {
    let mut dag = Dag::new();
    let left = scanned_rows(&mut dag, 0, FieldType::atomic(AtomicKind::Float64));
    let right = scanned_rows(&mut dag, 1, FieldType::atomic(AtomicKind::Bool));
    let join = dag.add_operator(OperatorKind::join(1));
    let sink = dag.add_operator(OperatorKind::materialize_row_vector());
    dag.add_edge(left, 0, join, 0).unwrap();
    dag.add_edge(right, 0, join, 1).unwrap();
    dag.add_edge(join, 0, sink, 0).unwrap();
    dag.set_sink(sink).unwrap();

    let registry = PlanRegistry::new();
    let id = register_plan(&registry, dag).unwrap();
    let result = execute_plan(
        &registry,
        id,
        "[[[[1, 0.5], [2, 1.5], [3, 2.5]]], [[[2, true], [1, false], [2, false]]]]",
    )
    .unwrap();
    assert_eq!(result, "[[1,0.5,false],[2,1.5,true],[2,1.5,false]]");
}

#[test]
fn test_group_by_over_json_input() {
    let mut dag = Dag::new();
    let rows = scanned_rows(&mut dag, 0, FieldType::atomic(AtomicKind::Float64));
    let group = dag.add_operator(OperatorKind::GroupBy(
        GroupByOp::new([0])
            .with_aggregate(AggregateExpr::count())
            .with_aggregate(AggregateExpr::sum(1))
            .with_aggregate(AggregateExpr::min(1)),
    ));
    dag.add_edge(rows, 0, group, 0).unwrap();
    dag.set_sink(group).unwrap();

    let registry = PlanRegistry::new();
    let id = register_plan(&registry, dag).unwrap();
    let result = execute_plan(&registry, id, "[[[[7, 1.0], [3, 2.0], [7, 0.5]]]]").unwrap();
    assert_eq!(result, "[[7,2,1.5,0.5],[3,1,2.0,2.0]]");
}

#[test]
fn test_int32_arithmetic_wraps_at_field_width() {
    let int32 = FieldType::atomic(AtomicKind::Int32);
    let mut dag = Dag::new();
    let lookup = dag.add_operator(OperatorKind::parameter_lookup(
        0,
        TupleType::positional([FieldType::array(int32)]),
    ));
    let scan = dag.add_operator(OperatorKind::row_scan(false));
    let doubled = dag.add_operator(OperatorKind::map(Expr::field(0).add(Expr::field(0))));
    let positive = dag.add_operator(OperatorKind::filter(Expr::field(0).gt(Expr::int(0))));
    let sink = dag.add_operator(OperatorKind::materialize_row_vector());
    dag.add_edge(lookup, 0, scan, 0).unwrap();
    dag.add_edge(scan, 0, doubled, 0).unwrap();
    dag.add_edge(doubled, 0, positive, 0).unwrap();
    dag.add_edge(positive, 0, sink, 0).unwrap();
    dag.set_sink(sink).unwrap();

    let registry = PlanRegistry::new();
    let id = register_plan(&registry, dag.clone()).unwrap();
    // i32::MAX + i32::MAX wraps to -2 and is filtered out.
    assert_eq!(execute_plan(&registry, id, "[[[2147483647, 3]]]").unwrap(), "[[6]]");

    dag.set_sink(doubled).unwrap();
    let id = register_plan(&registry, dag).unwrap();
    assert_eq!(
        execute_plan(&registry, id, "[[[2147483647, 3]]]").unwrap(),
        "[[-2],[6]]"
    );
}

#[test]
fn test_int32_sum_wraps_at_field_width() {
    let mut dag = Dag::new();
    let rows = scanned_rows(&mut dag, 0, FieldType::atomic(AtomicKind::Int32));
    let group = dag.add_operator(OperatorKind::GroupBy(
        GroupByOp::new([0]).with_aggregate(AggregateExpr::sum(1)),
    ));
    dag.add_edge(rows, 0, group, 0).unwrap();
    dag.set_sink(group).unwrap();

    let registry = PlanRegistry::new();
    let id = register_plan(&registry, dag).unwrap();
    let result = execute_plan(&registry, id, "[[[[1, 2147483647], [1, 1], [2, 5]]]]").unwrap();
    assert_eq!(result, "[[1,-2147483648],[2,5]]");
}

#[test]
fn test_execution_errors_surface() {
    let mut dag = Dag::new();
    let r = dag.add_operator(OperatorKind::range(0, 3, 1).unwrap());
    let single = dag.add_operator(OperatorKind::ensure_single_tuple());
    dag.add_edge(r, 0, single, 0).unwrap();
    dag.set_sink(single).unwrap();

    let registry = PlanRegistry::new();
    let id = register_plan(&registry, dag).unwrap();
    let err = execute_plan(&registry, id, "[]").unwrap_err();
    assert!(err.to_string().contains("expected exactly one tuple, got 3"), "{err}");
}

#[test]
fn test_input_validation() {
    let mut dag = Dag::new();
    let rows = scanned_rows(&mut dag, 0, FieldType::atomic(AtomicKind::Float64));
    dag.set_sink(rows).unwrap();

    let registry = PlanRegistry::new();
    let id = register_plan(&registry, dag).unwrap();
    assert!(execute_plan(&registry, id, "[]").unwrap_err().to_string().contains("expects 1 input"));
    assert!(execute_plan(&registry, id, "[[[[1, \"x\"]]]]").unwrap_err().is_parse_error());
    assert!(execute_plan(&registry, id, "not json").unwrap_err().is_parse_error());
    assert_eq!(execute_plan(&registry, id, "[[[]]]").unwrap(), "[]");
}

proptest! {
    #[test]
    fn test_filtered_range_matches(from in -20i64..20, len in 0i64..40, step in 1i64..4, k in -25i64..25) {
        let mut dag = Dag::new();
        let r = dag.add_operator(OperatorKind::range(from, from + len, step).unwrap());
        let f = dag.add_operator(OperatorKind::filter(Expr::field(0).gt(Expr::int(k))));
        let s = dag.add_operator(OperatorKind::materialize_row_vector());
        dag.add_edge(r, 0, f, 0).unwrap();
        dag.add_edge(f, 0, s, 0).unwrap();
        dag.set_sink(s).unwrap();

        let registry = PlanRegistry::new();
        let id = register_plan(&registry, dag).unwrap();
        let expected: Vec<String> = (from..from + len)
            .step_by(step as usize)
            .filter(|v| *v > k)
            .map(|v| format!("[{v}]"))
            .collect();
        prop_assert_eq!(
            execute_plan(&registry, id, "[]").unwrap(),
            format!("[{}]", expected.join(","))
        );
    }
}
