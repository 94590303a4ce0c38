//! Column annotation and liveness.
//!
//! Annotation walks the DAG producers-first and fills every operator's output
//! fields. A field that merely passes an input field through shares the
//! producer's column; a field the operator computes keeps the column it had at
//! the same position in a previous annotation when the type is unchanged, and
//! gets a fresh column otherwise. A reverse sweep then marks the output
//! columns no downstream operator reads as dead.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use common_error::{SluiceError, SluiceResult};
use sluice_core::{AttributeId, Column, Field, FieldProperty, fields_of};

use crate::dag::{Dag, OperatorId};
use crate::expr::Expr;
use crate::ops::OperatorKind;
use crate::schema_inference::{DagTypes, infer_types};
use crate::traversal::topological_order;

/// Where an output field's column comes from.
enum Origin {
    /// Input `.0`, field `.1`.
    Pass(usize, usize),
    New,
}

/// Annotate every operator of `dag` (and of its inner DAGs) with fields,
/// columns and read/write/dead sets.
pub fn annotate(dag: &mut Dag) -> SluiceResult<()> {
    let types = infer_types(dag)?;
    annotate_with(dag, &types)
}

fn annotate_with(dag: &mut Dag, types: &DagTypes) -> SluiceResult<()> {
    let order = topological_order(dag)?;

    for &id in &order {
        let op = dag.get(id)?;
        let inputs: Vec<Vec<Field>> = dag
            .in_flows(id)
            .into_iter()
            .map(|flow| dag.get(flow.operator).map(|p| p.fields.clone()))
            .collect::<SluiceResult<_>>()?;
        let previous = op.fields.clone();
        let read_set = read_columns(&op.kind, &inputs);
        let origins: Vec<(Origin, Vec<FieldProperty>)> = (0..types.output(id)?.len())
            .map(|i| (origin(&op.kind, i, &inputs), intrinsic_properties(&op.kind, i)))
            .collect();
        let inherits = inherits_properties(&op.kind);

        let mut fields = fields_of(types.output(id)?);
        let mut write_set = BTreeSet::new();
        for (field, (origin, properties)) in fields.iter_mut().zip(origins) {
            let passed = match origin {
                Origin::Pass(input, index) => inputs
                    .get(input)
                    .and_then(|fields| fields.get(index))
                    .filter(|source| source.column.is_some()),
                Origin::New => None,
            };
            match passed {
                Some(source) => {
                    field.column = source.column.clone();
                    if inherits {
                        field.properties.extend(source.properties.iter().copied());
                    }
                }
                None => {
                    let column = reuse_or_allocate(dag, &previous, field);
                    write_set.insert(column.id());
                    field.column = Some(column);
                }
            }
            field.properties.extend(properties);
        }

        let op = dag
            .operator_mut(id)
            .ok_or_else(|| SluiceError::internal("operator vanished"))?;
        op.fields = fields;
        op.read_set = read_set;
        op.write_set = write_set;

        if let Some(inner_types) = types.inner(id) {
            if let Some(inner) = dag.inner_dag_mut(id) {
                annotate_with(inner, inner_types)?;
            }
        }
    }

    mark_dead_columns(dag, &order)
}

fn reuse_or_allocate(dag: &mut Dag, previous: &[Field], field: &Field) -> Arc<Column> {
    previous
        .get(field.position)
        .filter(|old| old.field_type == field.field_type)
        .and_then(|old| old.column.clone())
        .unwrap_or_else(|| dag.column_allocator().allocate())
}

fn mark_dead_columns(dag: &mut Dag, order: &[OperatorId]) -> SluiceResult<()> {
    let sink = dag.sink();
    let mut live_after: BTreeMap<OperatorId, BTreeSet<AttributeId>> = BTreeMap::new();

    for &id in order.iter().rev() {
        let mut live = BTreeSet::new();
        for successor in dag.successors(id) {
            let succ = dag.get(successor)?;
            live.extend(succ.read_set.iter().copied());
            if let Some(after) = live_after.get(&successor) {
                live.extend(after.iter().copied());
            }
        }
        let op = dag.get(id)?;
        if sink == Some(id) {
            live.extend(op.fields.iter().filter_map(Field::column_id));
        }
        let dead = op
            .fields
            .iter()
            .filter_map(Field::column_id)
            .filter(|c| !live.contains(c))
            .collect();
        if let Some(op) = dag.operator_mut(id) {
            op.dead_set = dead;
        }
        live_after.insert(id, live);
    }
    Ok(())
}

fn origin(kind: &OperatorKind, position: usize, inputs: &[Vec<Field>]) -> Origin {
    let width = |input: usize| inputs.get(input).map_or(0, Vec::len);
    match kind {
        OperatorKind::Filter(_) | OperatorKind::EnsureSingleTuple(_) => Origin::Pass(0, position),
        OperatorKind::Projection(op) => op
            .source_of(position)
            .map_or(Origin::New, |p| Origin::Pass(0, p)),
        OperatorKind::Map(op) => match &op.func {
            Expr::Field { arg: 0, index } if position == 0 => Origin::Pass(0, *index),
            Expr::Tuple(items) => match items.get(position) {
                Some(Expr::Field { arg: 0, index }) => Origin::Pass(0, *index),
                _ => Origin::New,
            },
            _ => Origin::New,
        },
        OperatorKind::Join(op) => {
            let left = width(0);
            if position < left {
                Origin::Pass(0, position)
            } else {
                Origin::Pass(1, position - left + op.num_keys)
            }
        }
        OperatorKind::Cartesian(_) => {
            let left = width(0);
            if position < left {
                Origin::Pass(0, position)
            } else {
                Origin::Pass(1, position - left)
            }
        }
        OperatorKind::Partition(_) if position > 0 => Origin::Pass(0, position - 1),
        OperatorKind::GroupBy(op) => op
            .keys
            .get(position)
            .map_or(Origin::New, |&key| Origin::Pass(0, key)),
        OperatorKind::ReduceByKey(_) if position == 0 => Origin::Pass(0, 0),
        OperatorKind::Range(_)
        | OperatorKind::ConstantTuple(_)
        | OperatorKind::ParameterLookup(_)
        | OperatorKind::RowScan(_)
        | OperatorKind::Reduce(_)
        | OperatorKind::ReduceByKey(_)
        | OperatorKind::Partition(_)
        | OperatorKind::MaterializeRowVector(_)
        | OperatorKind::Pipeline(_) => Origin::New,
    }
}

fn inherits_properties(kind: &OperatorKind) -> bool {
    matches!(
        kind,
        OperatorKind::Filter(_)
            | OperatorKind::Projection(_)
            | OperatorKind::Map(_)
            | OperatorKind::EnsureSingleTuple(_)
    )
}

fn intrinsic_properties(kind: &OperatorKind, position: usize) -> Vec<FieldProperty> {
    match kind {
        OperatorKind::Range(_) => vec![FieldProperty::Sorted, FieldProperty::Unique],
        OperatorKind::RowScan(op) if op.add_index && position == 0 => {
            vec![FieldProperty::Sorted, FieldProperty::Unique]
        }
        OperatorKind::GroupBy(op) if position < op.keys.len() => {
            vec![FieldProperty::Grouped, FieldProperty::Unique]
        }
        OperatorKind::ReduceByKey(_) if position == 0 => vec![FieldProperty::Unique],
        _ => Vec::new(),
    }
}

fn column_at(inputs: &[Vec<Field>], input: usize, index: usize) -> Option<AttributeId> {
    inputs.get(input)?.get(index)?.column_id()
}

fn all_columns(inputs: &[Vec<Field>]) -> BTreeSet<AttributeId> {
    inputs
        .iter()
        .flatten()
        .filter_map(Field::column_id)
        .collect()
}

/// Columns an operator reads to compute its output.
fn read_columns(kind: &OperatorKind, inputs: &[Vec<Field>]) -> BTreeSet<AttributeId> {
    let from_expr = |expr: &Expr, offset: usize| -> BTreeSet<AttributeId> {
        // Every argument of an operator function ranges over input 0.
        expr.referenced_fields()
            .into_iter()
            .filter_map(|(_, index)| column_at(inputs, 0, index + offset))
            .collect()
    };
    match kind {
        OperatorKind::Filter(op) => from_expr(&op.predicate, 0),
        OperatorKind::Map(op) => from_expr(&op.func, 0),
        OperatorKind::Reduce(op) => from_expr(&op.func, 0),
        OperatorKind::ReduceByKey(op) => {
            let mut read = from_expr(&op.func, 1);
            read.extend(column_at(inputs, 0, 0));
            read
        }
        OperatorKind::GroupBy(op) => op
            .keys
            .iter()
            .copied()
            .chain(op.aggregates.iter().filter_map(|a| a.field))
            .filter_map(|index| column_at(inputs, 0, index))
            .collect(),
        OperatorKind::Join(op) => (0..op.num_keys)
            .flat_map(|k| [column_at(inputs, 0, k), column_at(inputs, 1, k)])
            .flatten()
            .collect(),
        OperatorKind::Partition(op) => column_at(inputs, 0, op.key).into_iter().collect(),
        OperatorKind::RowScan(_) => column_at(inputs, 0, 0).into_iter().collect(),
        OperatorKind::MaterializeRowVector(_) | OperatorKind::Pipeline(_) => all_columns(inputs),
        OperatorKind::Range(_)
        | OperatorKind::ConstantTuple(_)
        | OperatorKind::ParameterLookup(_)
        | OperatorKind::Projection(_)
        | OperatorKind::Cartesian(_)
        | OperatorKind::EnsureSingleTuple(_) => BTreeSet::new(),
    }
}
