//! Property-based tests for sluice-core.
//!
//! Strategies generate a field type first and then values inhabiting it, so
//! every generated value is well typed.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::types::{AtomicKind, FieldType, Tuple, TupleType, Value};

    fn arb_atomic() -> impl Strategy<Value = AtomicKind> {
        prop::sample::select(AtomicKind::ALL.to_vec())
    }

    fn arb_field_type() -> impl Strategy<Value = FieldType> {
        let leaf = arb_atomic().prop_map(FieldType::Atomic);
        leaf.prop_recursive(3, 12, 3, |inner| {
            prop_oneof![
                inner.clone().prop_map(FieldType::array),
                prop::collection::vec(inner, 1..4)
                    .prop_map(|types| FieldType::Tuple(TupleType::positional(types))),
            ]
        })
    }

    fn arb_tuple_type() -> impl Strategy<Value = TupleType> {
        prop::collection::vec(arb_field_type(), 0..5).prop_map(TupleType::positional)
    }

    /// Values of `field_type`; floats are integer-valued to survive JSON exactly.
    fn arb_value_of(field_type: FieldType) -> BoxedStrategy<Value> {
        match field_type {
            FieldType::Atomic(AtomicKind::Bool) => any::<bool>().prop_map(Value::Bool).boxed(),
            FieldType::Atomic(kind) if kind.is_integer() => {
                let (min, max) = kind.int_range().unwrap_or((0, 0));
                (min..=max).prop_map(Value::Int).boxed()
            }
            FieldType::Atomic(_) => any::<i32>()
                .prop_map(|i| Value::Float(f64::from(i)))
                .boxed(),
            FieldType::Tuple(t) => t
                .field_types()
                .cloned()
                .map(arb_value_of)
                .collect::<Vec<_>>()
                .prop_map(Value::Tuple)
                .boxed(),
            FieldType::Array(element) => {
                prop::collection::vec(arb_value_of(*element), 0..4)
                    .prop_map(Value::Array)
                    .boxed()
            }
        }
    }

    fn arb_typed_tuple() -> impl Strategy<Value = (TupleType, Value)> {
        arb_tuple_type().prop_flat_map(|t| {
            let values = arb_value_of(FieldType::Tuple(t.clone()));
            (Just(t), values)
        })
    }

    proptest! {
        #[test]
        fn prop_tuple_json_round_trip((tuple_type, value) in arb_typed_tuple()) {
            let json = value.to_json();
            let tuple = Tuple::from_json(&json, &tuple_type).unwrap();
            prop_assert_eq!(Value::Tuple(tuple.values().to_vec()), value);
            prop_assert_eq!(tuple.to_json(), json);
        }

        #[test]
        fn prop_generated_values_conform((tuple_type, value) in arb_typed_tuple()) {
            prop_assert!(value.conforms_to(&FieldType::Tuple(tuple_type)));
        }

        #[test]
        fn prop_definition_is_deterministic(t in arb_tuple_type()) {
            let mut resolve = |nested: &TupleType| format!("tuple_{}", nested.len());
            let first = t.compute_definition(&mut resolve);
            let second = t.clone().compute_definition(&mut resolve);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_type_serde_round_trip(t in arb_tuple_type()) {
            let json = serde_json::to_string(&t).unwrap();
            let back: TupleType = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, t);
        }
    }
}
