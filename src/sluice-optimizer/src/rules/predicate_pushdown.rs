//! Predicate pushdown optimization rule.

use common_error::{SluiceError, SluiceResult};
use sluice_dag::{Dag, Expr, OperatorId, OperatorKind, annotate};

use super::OptimizationRule;
use super::rule::Transformed;

/// Predicate pushdown optimization.
///
/// Moves a filter below the operator feeding it when the filter can be
/// evaluated on that operator's input instead:
/// - below a projection, with field positions mapped through the projection;
/// - below one side of a join or cartesian product, when every column the
///   predicate reads comes from that side.
///
/// Only producers whose single consumer is the filter are rewritten. The rule
/// repeats until no filter moves, descending into pipeline inner DAGs, so
/// applying it twice never changes the DAG the second time.
pub struct PredicatePushdown;

impl OptimizationRule for PredicatePushdown {
    fn name(&self) -> &'static str {
        "PredicatePushdown"
    }

    fn description(&self) -> &'static str {
        "Move filters below projections, joins and cartesian products"
    }

    fn apply(&self, dag: &mut Dag) -> SluiceResult<Transformed> {
        let mut changed = false;
        loop {
            // Column identities drive side selection; refresh them after
            // every move.
            annotate(dag)?;
            if !push_one(dag)? {
                break;
            }
            changed = true;
        }
        Ok(changed.into())
    }
}

/// A filter that can move below its producer.
struct Pushdown {
    filter: OperatorId,
    below: OperatorId,
    port: usize,
    predicate: Expr,
}

fn push_one(dag: &mut Dag) -> SluiceResult<bool> {
    if let Some(pushdown) = find_pushdown(dag) {
        apply_pushdown(dag, pushdown)?;
        return Ok(true);
    }
    for id in dag.operator_ids() {
        if let Some(inner) = dag.inner_dag_mut(id) {
            if push_one(inner)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn find_pushdown(dag: &Dag) -> Option<Pushdown> {
    dag.operators().find_map(|op| {
        let OperatorKind::Filter(filter) = &op.kind else {
            return None;
        };
        let below = dag.predecessor(op.id, 0)?;
        if dag.out_flows(below).len() != 1 {
            return None;
        }
        let (port, predicate) = match &dag.operator(below)?.kind {
            OperatorKind::Projection(projection) => {
                let predicate = filter
                    .predicate
                    .remap_fields(&|arg, index| Some((arg, projection.source_of(index)?)))?;
                (0, predicate)
            }
            OperatorKind::Join(_) | OperatorKind::Cartesian(_) => {
                side_predicate(dag, below, &filter.predicate)?
            }
            _ => return None,
        };
        Some(Pushdown {
            filter: op.id,
            below,
            port,
            predicate,
        })
    })
}

/// Rewrite `predicate`, which reads the output of a two-input operator, over
/// the input that supplies all of its columns.
fn side_predicate(dag: &Dag, product: OperatorId, predicate: &Expr) -> Option<(usize, Expr)> {
    let columns = dag.operator(product)?.column_ids();
    for port in 0..2 {
        let side = dag.operator(dag.predecessor(product, port)?)?.column_ids();
        let remapped = predicate.remap_fields(&|arg, index| {
            let column = (*columns.get(index)?)?;
            // A column repeated in the output (a self-product) does not
            // identify which copy the predicate reads.
            if columns.iter().filter(|c| **c == Some(column)).count() != 1 {
                return None;
            }
            let position = side.iter().position(|c| *c == Some(column))?;
            Some((arg, position))
        });
        if let Some(predicate) = remapped {
            return Some((port, predicate));
        }
    }
    None
}

fn apply_pushdown(dag: &mut Dag, pushdown: Pushdown) -> SluiceResult<()> {
    let Pushdown {
        filter,
        below,
        port,
        predicate,
    } = pushdown;
    let source = dag.predecessor(below, port).ok_or_else(|| {
        SluiceError::internal(format!("input {port} of operator {below} is unbound"))
    })?;

    let consumers = dag.out_flows(filter);
    for consumer in &consumers {
        dag.remove_edge(consumer.operator, consumer.port);
    }
    dag.remove_edge(filter, 0);
    dag.remove_edge(below, port);

    dag.add_edge(source, 0, filter, 0)?;
    dag.add_edge(filter, 0, below, port)?;
    for consumer in consumers {
        dag.add_edge(below, 0, consumer.operator, consumer.port)?;
    }
    if dag.sink() == Some(filter) {
        dag.set_sink(below)?;
    }
    if let Some(op) = dag.operator_mut(filter) {
        op.kind = OperatorKind::filter(predicate);
    }

    log::debug!("pushed filter {filter} below operator {below} (input {port})");
    Ok(())
}
