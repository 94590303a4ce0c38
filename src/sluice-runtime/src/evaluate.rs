//! Reference evaluator.
//!
//! Evaluates a validated DAG over in-memory [`Value`]s, one operator at a
//! time in topological order. Every operator consumes the complete output
//! of its predecessors; there is no streaming.
//!
//! Values are stored at the width of their inferred type after every
//! operator, so integer results wrap exactly where the generated code's
//! fixed-width fields do.

use std::collections::BTreeMap;

use common_error::{SluiceError, SluiceResult};
use indexmap::IndexMap;
use serde_json::Value as Json;
use sluice_core::{Tuple, TupleType, Value};
use sluice_dag::ops::{GroupByOp, PartitionOp};
use sluice_dag::{
    Dag, DagOperator, DagTypes, Expr, OperatorId, OperatorKind, infer_types, topological_order,
};

use crate::aggregate::{Accumulator, accumulator};
use crate::plan::Plan;

/// The tuples flowing out of one operator, as field value lists.
pub type Rows = Vec<Vec<Value>>;

/// A DAG evaluated in process.
#[derive(Debug, Clone)]
pub struct EvaluatedPlan {
    dag: Dag,
    types: DagTypes,
    input_types: Vec<TupleType>,
    /// Whether the sink yields a single `{v0: array<T>}` tuple.
    row_vector_result: bool,
}

impl EvaluatedPlan {
    /// Validate and type `dag` and bind its outer parameter lookups.
    ///
    /// Inputs must be numbered `0..n` without gaps, and every lookup of the
    /// same input must declare the same type.
    pub fn new(dag: Dag) -> SluiceResult<Self> {
        dag.validate()?;
        let types = infer_types(&dag)?;
        let sink = dag
            .sink()
            .ok_or_else(|| SluiceError::invalid_parameter("DAG has no sink"))?;
        let output = types.output(sink)?;
        let row_vector_result = output.len() == 1
            && output
                .field(0)
                .is_some_and(|f| f.field_type.as_array_element().is_some());

        Ok(Self {
            input_types: declared_inputs(&dag)?,
            dag,
            types,
            row_vector_result,
        })
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    /// The tuples the sink produces for `inputs`.
    pub fn evaluate(&self, inputs: &[Tuple]) -> SluiceResult<Rows> {
        if inputs.len() != self.input_types.len() {
            return Err(SluiceError::invalid_parameter(format!(
                "plan expects {} input(s), got {}",
                self.input_types.len(),
                inputs.len()
            )));
        }
        for (i, (input, expected)) in inputs.iter().zip(&self.input_types).enumerate() {
            if !input.tuple_type().same_shape(expected) {
                return Err(SluiceError::invalid_parameter(format!(
                    "input {i} has type {}, expected {expected}",
                    input.tuple_type()
                )));
            }
        }
        let inputs: Vec<Rows> = inputs.iter().map(|t| vec![t.values().to_vec()]).collect();
        evaluate_level(&self.dag, &self.types, &inputs)
    }
}

impl Plan for EvaluatedPlan {
    fn input_types(&self) -> &[TupleType] {
        &self.input_types
    }

    fn execute(&self, inputs: &[Tuple]) -> SluiceResult<Vec<Value>> {
        let rows = self.evaluate(inputs)?;
        if self.row_vector_result {
            let [row] = rows.as_slice() else {
                return Err(SluiceError::execution(format!(
                    "expected one row vector, got {} tuples",
                    rows.len()
                )));
            };
            let elements = row
                .first()
                .and_then(Value::as_array)
                .ok_or_else(|| SluiceError::execution("result is not a row vector"))?;
            return Ok(elements
                .iter()
                .map(|element| match element {
                    Value::Tuple(_) => element.clone(),
                    other => Value::Tuple(vec![other.clone()]),
                })
                .collect());
        }
        // Same as materializing the sink first.
        Ok(rows.into_iter().map(Value::Tuple).collect())
    }
}

fn declared_inputs(dag: &Dag) -> SluiceResult<Vec<TupleType>> {
    let mut declared: BTreeMap<usize, TupleType> = BTreeMap::new();
    for op in dag.operators() {
        let OperatorKind::ParameterLookup(lookup) = &op.kind else {
            continue;
        };
        let Some(output_type) = &lookup.output_type else {
            return Err(SluiceError::invalid_parameter(format!(
                "{} does not declare its type",
                op.name()
            )));
        };
        match declared.get(&lookup.parameter_num) {
            Some(existing) if !existing.same_shape(output_type) => {
                return Err(SluiceError::invalid_parameter(format!(
                    "parameter {} is declared as both {existing} and {output_type}",
                    lookup.parameter_num
                )));
            }
            Some(_) => {}
            None => {
                declared.insert(lookup.parameter_num, output_type.clone());
            }
        }
    }
    if let Some(missing) = (0..declared.len()).find(|n| !declared.contains_key(n)) {
        return Err(SluiceError::invalid_parameter(format!(
            "plan inputs must be numbered from 0, parameter {missing} is missing"
        )));
    }
    Ok(declared.into_values().collect())
}

/// Evaluate an outer DAG. `inputs` binds its parameter lookups.
pub fn evaluate_dag(dag: &Dag, inputs: &[Rows]) -> SluiceResult<Rows> {
    let types = infer_types(dag)?;
    evaluate_level(dag, &types, inputs)
}

/// Evaluate one DAG level whose operator types are `types`.
fn evaluate_level(dag: &Dag, types: &DagTypes, inputs: &[Rows]) -> SluiceResult<Rows> {
    let mut results: BTreeMap<OperatorId, Rows> = BTreeMap::new();
    for id in topological_order(dag)? {
        let op = dag.get(id)?;
        let rows = {
            let mut operands = Vec::new();
            let mut operand_types = Vec::new();
            for flow in dag.in_flows(id) {
                operands.push(results.get(&flow.operator).ok_or_else(|| {
                    SluiceError::internal(format!("{} evaluated before its input", op.name()))
                })?);
                operand_types.push(types.output(flow.operator)?);
            }
            let level = Level {
                operands: &operands,
                types: &operand_types,
                inner: types.inner(id),
                inputs,
            };
            let rows = evaluate_operator(op, &level).map_err(|e| with_operator(e, op))?;
            conform(rows, types.output(id)?)
        };
        log::trace!("{} produced {} tuple(s)", op.name(), rows.len());
        results.insert(id, rows);
    }
    let sink = dag
        .sink()
        .ok_or_else(|| SluiceError::invalid_parameter("DAG has no sink"))?;
    results
        .remove(&sink)
        .ok_or_else(|| SluiceError::internal(format!("sink {sink} was not evaluated")))
}

fn with_operator(err: SluiceError, op: &DagOperator) -> SluiceError {
    match err {
        SluiceError::Execution(msg) => SluiceError::Execution(format!("{}: {msg}", op.name())),
        other => other,
    }
}

/// Store every field of `rows` at the width of its declared type.
fn conform(rows: Rows, output: &TupleType) -> Rows {
    rows.into_iter().map(|row| conform_row(row, output)).collect()
}

fn conform_row(row: Vec<Value>, row_type: &TupleType) -> Vec<Value> {
    if row.len() != row_type.len() {
        return row;
    }
    row.into_iter()
        .zip(row_type.field_types())
        .map(|(value, field_type)| value.store_as(field_type))
        .collect()
}

/// What one operator sees of the level it is evaluated in.
struct Level<'a> {
    operands: &'a [&'a Rows],
    types: &'a [&'a TupleType],
    /// Types of the inner DAG, for pipelines.
    inner: Option<&'a DagTypes>,
    inputs: &'a [Rows],
}

impl<'a> Level<'a> {
    fn operand(&self, port: usize) -> SluiceResult<&'a Rows> {
        self.operands
            .get(port)
            .copied()
            .ok_or_else(|| SluiceError::internal(format!("input {port} is not bound")))
    }

    fn operand_type(&self, port: usize) -> SluiceResult<&'a TupleType> {
        self.types
            .get(port)
            .copied()
            .ok_or_else(|| SluiceError::internal(format!("input {port} is not typed")))
    }
}

fn evaluate_operator(op: &DagOperator, level: &Level<'_>) -> SluiceResult<Rows> {
    let operand = |port| level.operand(port);
    match &op.kind {
        OperatorKind::Range(range) => Ok(range.values().map(|v| vec![Value::Int(v)]).collect()),
        OperatorKind::ConstantTuple(constant) => {
            Ok(vec![constant.values.iter().map(|lit| lit.value()).collect()])
        }
        OperatorKind::ParameterLookup(lookup) => {
            level.inputs.get(lookup.parameter_num).cloned().ok_or_else(|| {
                SluiceError::execution(format!("input {} is not bound", lookup.parameter_num))
            })
        }
        OperatorKind::RowScan(scan) => {
            let mut out = Vec::new();
            for row in operand(0)? {
                let elements = row
                    .first()
                    .and_then(Value::as_array)
                    .ok_or_else(|| SluiceError::execution("row scan input is not an array"))?;
                for (index, element) in elements.iter().enumerate() {
                    let mut scanned = Vec::new();
                    if scan.add_index {
                        scanned.push(Value::Int(i64::try_from(index).unwrap_or(i64::MAX)));
                    }
                    scanned.extend(into_fields(element.clone()));
                    out.push(scanned);
                }
            }
            Ok(out)
        }
        OperatorKind::Filter(filter) => {
            let row_type = level.operand_type(0)?;
            let mut out = Vec::new();
            for row in operand(0)? {
                if matches_predicate(&filter.predicate, row, row_type)? {
                    out.push(row.clone());
                }
            }
            Ok(out)
        }
        OperatorKind::Map(map) => {
            let row_type = std::slice::from_ref(level.operand_type(0)?);
            operand(0)?
                .iter()
                .map(|row| map.func.eval_typed(&[row.as_slice()], row_type).map(into_fields))
                .collect()
        }
        OperatorKind::Projection(projection) => operand(0)?
            .iter()
            .map(|row| {
                projection
                    .positions
                    .iter()
                    .map(|&p| {
                        row.get(p).cloned().ok_or_else(|| {
                            SluiceError::execution(format!("field {p} is missing"))
                        })
                    })
                    .collect::<SluiceResult<Vec<_>>>()
            })
            .collect(),
        OperatorKind::Reduce(reduce) => {
            let row_type = level.operand_type(0)?;
            let arg_types = [row_type.clone(), row_type.clone()];
            let mut acc: Option<Vec<Value>> = None;
            for row in operand(0)? {
                acc = Some(match acc {
                    None => row.clone(),
                    Some(acc) => fold(&reduce.func, &acc, row, &arg_types)?,
                });
            }
            Ok(acc.into_iter().collect())
        }
        OperatorKind::ReduceByKey(reduce) => {
            let values_type =
                TupleType::positional(level.operand_type(0)?.field_types().skip(1).cloned());
            let arg_types = [values_type.clone(), values_type];
            let mut groups: IndexMap<String, (Value, Vec<Value>)> = IndexMap::new();
            for row in operand(0)? {
                let (key, values) = row
                    .split_first()
                    .ok_or_else(|| SluiceError::execution("tuple has no key field"))?;
                let group_key = key_of(std::slice::from_ref(key));
                match groups.get_mut(&group_key) {
                    Some((_, acc)) => *acc = fold(&reduce.func, acc, values, &arg_types)?,
                    None => {
                        groups.insert(group_key, (key.clone(), values.to_vec()));
                    }
                }
            }
            Ok(groups
                .into_values()
                .map(|(key, values)| std::iter::once(key).chain(values).collect())
                .collect())
        }
        OperatorKind::GroupBy(group_by) => {
            evaluate_group_by(group_by, operand(0)?, level.operand_type(0)?)
        }
        OperatorKind::Join(join) => {
            let (left, right) = (operand(0)?, operand(1)?);
            let keys = join.num_keys;
            let mut by_key: IndexMap<String, Vec<&Vec<Value>>> = IndexMap::new();
            for row in right {
                by_key.entry(key_of(prefix(row, keys)?)).or_default().push(row);
            }
            let mut out = Vec::new();
            for row in left {
                if let Some(matches) = by_key.get(&key_of(prefix(row, keys)?)) {
                    for other in matches {
                        out.push(row.iter().chain(&other[keys..]).cloned().collect());
                    }
                }
            }
            Ok(out)
        }
        OperatorKind::Cartesian(_) => {
            let (left, right) = (operand(0)?, operand(1)?);
            Ok(left
                .iter()
                .flat_map(|l| {
                    right
                        .iter()
                        .map(move |r| l.iter().chain(r).cloned().collect::<Vec<_>>())
                })
                .collect())
        }
        OperatorKind::Partition(partition) => operand(0)?
            .iter()
            .map(|row| partition_row(partition, row))
            .collect(),
        OperatorKind::MaterializeRowVector(_) => {
            let rows = operand(0)?;
            Ok(vec![vec![Value::Array(
                rows.iter().cloned().map(Value::Tuple).collect(),
            )]])
        }
        OperatorKind::EnsureSingleTuple(_) => {
            let rows = operand(0)?;
            if rows.len() != 1 {
                return Err(SluiceError::execution(format!(
                    "expected exactly one tuple, got {}",
                    rows.len()
                )));
            }
            Ok(rows.clone())
        }
        OperatorKind::Pipeline(pipeline) => {
            let inner = level.inner.ok_or_else(|| {
                SluiceError::internal(format!("inner DAG of {} is not typed", op.name()))
            })?;
            let bound: Vec<Rows> = level.operands.iter().map(|rows| (*rows).clone()).collect();
            evaluate_level(&pipeline.inner_dag, inner, &bound)
        }
    }
}

fn matches_predicate(predicate: &Expr, row: &[Value], row_type: &TupleType) -> SluiceResult<bool> {
    match predicate.eval_typed(&[row], std::slice::from_ref(row_type))? {
        Value::Bool(b) => Ok(b),
        other => Err(SluiceError::execution(format!(
            "predicate returned {}, expected bool",
            other.type_name()
        ))),
    }
}

/// Apply a two-argument fold function to the accumulator and the next tuple.
/// The new accumulator is stored at the accumulator's type.
fn fold(
    func: &Expr,
    acc: &[Value],
    next: &[Value],
    arg_types: &[TupleType; 2],
) -> SluiceResult<Vec<Value>> {
    let fields = into_fields(func.eval_typed(&[acc, next], arg_types)?);
    Ok(conform_row(fields, &arg_types[0]))
}

/// Fields of a function result; a bare value is a single-field tuple.
fn into_fields(value: Value) -> Vec<Value> {
    match value {
        Value::Tuple(fields) => fields,
        other => vec![other],
    }
}

fn prefix(row: &[Value], len: usize) -> SluiceResult<&[Value]> {
    row.get(..len)
        .ok_or_else(|| SluiceError::execution(format!("tuple has fewer than {len} key fields")))
}

/// Hashable identity of a list of atomic values.
fn key_of(values: &[Value]) -> String {
    Json::Array(values.iter().map(Value::to_json).collect()).to_string()
}

fn partition_row(partition: &PartitionOp, row: &[Value]) -> SluiceResult<Vec<Value>> {
    let key = row
        .get(partition.key)
        .and_then(Value::as_int)
        .ok_or_else(|| SluiceError::execution("partition key is not an integer"))?;
    Ok(std::iter::once(Value::Int(partition.partition_of(key)))
        .chain(row.iter().cloned())
        .collect())
}

fn evaluate_group_by(op: &GroupByOp, rows: &Rows, row_type: &TupleType) -> SluiceResult<Rows> {
    let field_kind = |field: Option<usize>| {
        field
            .and_then(|f| row_type.field(f))
            .and_then(|f| f.field_type.as_atomic())
    };
    let mut groups: IndexMap<String, (Vec<Value>, Vec<Box<dyn Accumulator>>)> = IndexMap::new();
    for row in rows {
        let keys = op
            .keys
            .iter()
            .map(|&k| {
                row.get(k)
                    .cloned()
                    .ok_or_else(|| SluiceError::execution(format!("group key {k} is missing")))
            })
            .collect::<SluiceResult<Vec<_>>>()?;
        let (_, accumulators) = groups.entry(key_of(&keys)).or_insert_with(|| {
            let accumulators = op
                .aggregates
                .iter()
                .map(|aggregate| accumulator(aggregate, field_kind(aggregate.field)))
                .collect();
            (keys, accumulators)
        });
        for (aggregate, acc) in op.aggregates.iter().zip(accumulators.iter_mut()) {
            acc.update(aggregate.field.and_then(|f| row.get(f)))?;
        }
    }
    Ok(groups
        .into_values()
        .map(|(keys, accumulators)| {
            keys.into_iter()
                .chain(accumulators.iter().map(|acc| acc.finalize()))
                .collect()
        })
        .collect())
}
