//! Integration tests for sluice-core
//!
//! These tests exercise the public surface across modules: types feeding
//! fields, fields sharing columns, and typed tuples built from JSON.

use std::sync::Arc;

use sluice_core::*;

#[test]
fn test_fields_share_columns() {
    let mut allocator = ColumnAllocator::new();
    let column = allocator.allocate();

    let producer = Field::new(0, "v0", FieldType::atomic(AtomicKind::Int64))
        .with_column(Arc::clone(&column));
    let consumer = Field::new(0, "v0", FieldType::atomic(AtomicKind::Int64))
        .with_column(Arc::clone(&column));

    assert_eq!(producer.column_id(), consumer.column_id());
    assert_eq!(Arc::strong_count(&column), 3);

    drop(producer);
    drop(consumer);
    assert_eq!(Arc::strong_count(&column), 1);
}

#[test]
fn test_identical_types_identical_definitions() {
    let build = || {
        TupleType::positional([
            FieldType::atomic(AtomicKind::Int32),
            FieldType::atomic(AtomicKind::Bool),
        ])
    };
    let mut resolve = |_: &TupleType| String::from("unused");
    assert_eq!(
        build().compute_definition(&mut resolve),
        build().compute_definition(&mut resolve)
    );
    assert_eq!(build(), build());
}

#[test]
fn test_plan_input_shape() {
    // A plan input is a single array-valued field of element tuples.
    let element = TupleType::positional([
        FieldType::atomic(AtomicKind::Int64),
        FieldType::atomic(AtomicKind::Float64),
    ]);
    let input = TupleType::positional([FieldType::array(FieldType::Tuple(element))]);

    let json = serde_json::json!([[[1, 0.5], [2, 1.5]]]);
    let tuple = Tuple::from_json(&json, &input).unwrap();
    let rows = tuple.get(0).and_then(Value::as_array).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].as_tuple().unwrap()[0], Value::Int(2));
    assert_eq!(tuple.to_json(), json);
}

#[test]
fn test_type_display() {
    let t = TupleType::positional([
        FieldType::atomic(AtomicKind::Int64),
        FieldType::array(FieldType::atomic(AtomicKind::Float32)),
    ]);
    assert_eq!(t.to_string(), "{v0: int64, v1: array<float32>}");
    assert_eq!(FieldProperty::Grouped.to_string(), "grouped");
}
