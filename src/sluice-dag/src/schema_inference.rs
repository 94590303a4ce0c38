//! Schema inference for DAG operators.
//!
//! Output types are a pure function of the operator kind and its input types.
//! Inference never mutates the DAG; [`crate::annotate`] builds on it to fill
//! in fields and columns.

use std::collections::BTreeMap;

use common_error::{SluiceError, SluiceResult, schema_err};
use sluice_core::{AtomicKind, FieldType, TupleType};

use crate::dag::{Dag, OperatorId};
use crate::ops::{AggregateFunc, GroupByOp, OperatorKind};
use crate::traversal::topological_order;

/// Inferred output types of every operator of a DAG, with the types of
/// pipeline inner DAGs nested under the pipeline's id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DagTypes {
    types: BTreeMap<OperatorId, TupleType>,
    inner: BTreeMap<OperatorId, DagTypes>,
}

impl DagTypes {
    pub fn get(&self, id: OperatorId) -> Option<&TupleType> {
        self.types.get(&id)
    }

    /// Output type of `id`, failing if it was never inferred.
    pub fn output(&self, id: OperatorId) -> SluiceResult<&TupleType> {
        self.types
            .get(&id)
            .ok_or_else(|| SluiceError::internal(format!("no inferred type for operator {id}")))
    }

    /// Types of the inner DAG of pipeline `id`.
    pub fn inner(&self, id: OperatorId) -> Option<&DagTypes> {
        self.inner.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OperatorId, &TupleType)> {
        self.types.iter().map(|(id, t)| (*id, t))
    }
}

/// Infer the types of an outer DAG.
pub fn infer_types(dag: &Dag) -> SluiceResult<DagTypes> {
    infer_types_with_inputs(dag, None)
}

/// Infer the types of a DAG. `pipeline_inputs` is `Some` for the inner DAG
/// of a pipeline and binds its parameter lookups.
pub fn infer_types_with_inputs(
    dag: &Dag,
    pipeline_inputs: Option<&[TupleType]>,
) -> SluiceResult<DagTypes> {
    let mut result = DagTypes::default();
    for id in topological_order(dag)? {
        let op = dag.get(id)?;
        let inputs = input_types(dag, id, &result)?;
        let output = match &op.kind {
            OperatorKind::Pipeline(p) => {
                check_arity(&op.kind, &inputs)?;
                let inner = infer_types_with_inputs(&p.inner_dag, Some(&inputs))?;
                let sink = p.inner_dag.sink().ok_or_else(|| {
                    SluiceError::schema(format!("inner DAG of {} has no sink", op.name()))
                })?;
                let output = inner.output(sink)?.clone();
                result.inner.insert(id, inner);
                output
            }
            kind => infer_output_type(kind, &inputs, pipeline_inputs)
                .map_err(|e| with_operator(e, &op.name()))?,
        };
        result.types.insert(id, output);
    }
    Ok(result)
}

fn input_types(dag: &Dag, id: OperatorId, known: &DagTypes) -> SluiceResult<Vec<TupleType>> {
    dag.in_flows(id)
        .into_iter()
        .map(|flow| known.output(flow.operator).cloned())
        .collect()
}

fn with_operator(err: SluiceError, name: &str) -> SluiceError {
    match err {
        SluiceError::Schema(msg) => SluiceError::Schema(format!("{name}: {msg}")),
        other => other,
    }
}

fn check_arity(kind: &OperatorKind, inputs: &[TupleType]) -> SluiceResult<()> {
    if inputs.len() != kind.num_in_ports() {
        schema_err!(
            "{} expects {} input(s), {} bound",
            kind.tag(),
            kind.num_in_ports(),
            inputs.len()
        );
    }
    Ok(())
}

/// Output type of one operator given its input types.
///
/// `pipeline_inputs` binds parameter lookups inside a pipeline's inner DAG.
/// Pipelines themselves are inferred by [`infer_types_with_inputs`], which
/// has access to the inner DAG.
pub fn infer_output_type(
    kind: &OperatorKind,
    inputs: &[TupleType],
    pipeline_inputs: Option<&[TupleType]>,
) -> SluiceResult<TupleType> {
    check_arity(kind, inputs)?;
    match kind {
        OperatorKind::Range(_) => Ok(TupleType::scalar(AtomicKind::Int64)),
        OperatorKind::ConstantTuple(op) => Ok(op.output_type()),
        OperatorKind::ParameterLookup(op) => match (pipeline_inputs, &op.output_type) {
            (Some(bound), declared) => {
                let Some(input) = bound.get(op.parameter_num) else {
                    schema_err!(
                        "pipeline has {} input(s), parameter {} is out of range",
                        bound.len(),
                        op.parameter_num
                    );
                };
                if let Some(declared) = declared {
                    if !declared.same_shape(input) {
                        schema_err!(
                            "declared type {declared} does not match pipeline input {input}"
                        );
                    }
                }
                Ok(input.clone())
            }
            (None, Some(declared)) => Ok(declared.clone()),
            (None, None) => schema_err!(
                "parameter {} needs an output_type outside a pipeline",
                op.parameter_num
            ),
        },
        OperatorKind::RowScan(op) => {
            let input = &inputs[0];
            let element = input
                .field(0)
                .and_then(|f| f.field_type.as_array_element())
                .ok_or_else(|| {
                    SluiceError::schema(format!("row scan needs an array in field 0, got {input}"))
                })?;
            let row = match element {
                FieldType::Tuple(t) => t.clone(),
                other => TupleType::positional([other.clone()]),
            };
            Ok(if op.add_index {
                TupleType::scalar(AtomicKind::Int64).concat(&row)
            } else {
                row
            })
        }
        OperatorKind::Filter(op) => {
            let t = op.predicate.infer_type(inputs)?;
            if !t.is_bool() {
                schema_err!("filter predicate must be bool, got {t}");
            }
            Ok(inputs[0].clone())
        }
        OperatorKind::Map(op) => Ok(match op.func.infer_type(inputs)? {
            FieldType::Tuple(t) => t,
            scalar => TupleType::positional([scalar]),
        }),
        OperatorKind::Projection(op) => inputs[0].project(&op.positions),
        OperatorKind::Reduce(op) => {
            let input = &inputs[0];
            let args = [input.clone(), input.clone()];
            check_fold_result(&op.func.infer_type(&args)?, input)?;
            Ok(input.clone())
        }
        OperatorKind::ReduceByKey(op) => {
            let input = &inputs[0];
            let key = input
                .field(0)
                .ok_or_else(|| SluiceError::schema("reduce by key needs a key field"))?;
            if key.field_type.as_atomic().is_none() {
                schema_err!("reduce by key needs an atomic key, got {}", key.field_type);
            }
            let values = TupleType::positional(input.field_types().skip(1).cloned());
            let args = [values.clone(), values.clone()];
            check_fold_result(&op.func.infer_type(&args)?, &values)?;
            Ok(input.clone())
        }
        OperatorKind::GroupBy(op) => infer_group_by(op, &inputs[0]),
        OperatorKind::Join(op) => {
            let (left, right) = (&inputs[0], &inputs[1]);
            if op.num_keys > left.len() || op.num_keys > right.len() {
                schema_err!(
                    "join on {} key(s) needs at least that many fields on both sides",
                    op.num_keys
                );
            }
            let left_types: Vec<&FieldType> = left.field_types().collect();
            let right_types: Vec<&FieldType> = right.field_types().collect();
            for k in 0..op.num_keys {
                if left_types[k] != right_types[k] {
                    schema_err!(
                        "join key {k} types differ: {} vs {}",
                        left_types[k],
                        right_types[k]
                    );
                }
                if left_types[k].as_atomic().is_none() {
                    schema_err!("join key {k} must be atomic, got {}", left_types[k]);
                }
            }
            let types = left_types
                .iter()
                .copied()
                .chain(right_types[op.num_keys..].iter().copied())
                .cloned();
            Ok(TupleType::positional(types))
        }
        OperatorKind::Cartesian(_) => Ok(inputs[0].concat(&inputs[1])),
        OperatorKind::Partition(op) => {
            let input = &inputs[0];
            let key = input.field(op.key).ok_or_else(|| {
                SluiceError::schema(format!("partition key {} out of range for {input}", op.key))
            })?;
            if !key.field_type.is_integer() {
                schema_err!("partition key must be an integer, got {}", key.field_type);
            }
            Ok(TupleType::scalar(AtomicKind::Int64).concat(input))
        }
        OperatorKind::MaterializeRowVector(_) => Ok(TupleType::positional([FieldType::array(
            FieldType::Tuple(inputs[0].clone()),
        )])),
        OperatorKind::EnsureSingleTuple(_) => Ok(inputs[0].clone()),
        OperatorKind::Pipeline(p) => {
            let inner = infer_types_with_inputs(&p.inner_dag, Some(inputs))?;
            let sink = p
                .inner_dag
                .sink()
                .ok_or_else(|| SluiceError::schema("pipeline inner DAG has no sink"))?;
            inner.output(sink).cloned()
        }
    }
}

fn check_fold_result(result: &FieldType, expected: &TupleType) -> SluiceResult<()> {
    match result {
        FieldType::Tuple(t) if t.same_shape(expected) => Ok(()),
        // A single-field fold may return the bare value.
        scalar if expected.len() == 1 && expected.field(0).map(|f| &f.field_type) == Some(scalar) => {
            Ok(())
        }
        other => schema_err!("fold function must return {expected}, got {other}"),
    }
}

fn infer_group_by(op: &GroupByOp, input: &TupleType) -> SluiceResult<TupleType> {
    let mut types = Vec::with_capacity(op.keys.len() + op.aggregates.len());
    for &key in &op.keys {
        let field = input.field(key).ok_or_else(|| {
            SluiceError::schema(format!("group key {key} out of range for {input}"))
        })?;
        if field.field_type.as_atomic().is_none() {
            schema_err!("group key {key} must be atomic, got {}", field.field_type);
        }
        types.push(field.field_type.clone());
    }
    for agg in &op.aggregates {
        if agg.func == AggregateFunc::Count {
            types.push(FieldType::atomic(AtomicKind::Int64));
            continue;
        }
        let Some(index) = agg.field else {
            schema_err!("aggregate {} needs a field", agg.func.name());
        };
        let field = input.field(index).ok_or_else(|| {
            SluiceError::schema(format!("aggregate field {index} out of range for {input}"))
        })?;
        if !field.field_type.is_numeric() {
            schema_err!(
                "aggregate {} needs a numeric field, got {}",
                agg.func.name(),
                field.field_type
            );
        }
        types.push(field.field_type.clone());
    }
    Ok(TupleType::positional(types))
}
