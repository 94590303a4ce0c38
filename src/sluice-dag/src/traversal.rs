//! Traversal engine.
//!
//! All traversals share one routine parameterised by a [`Direction`] and a
//! recursion flag. Operators are ordered with Kahn's algorithm, breaking ties
//! by ascending id, so orders are deterministic; the reverse order is the
//! exact reverse of the forward one. A cyclic graph is rejected before any
//! visitor callback runs.

use std::collections::{BTreeMap, BTreeSet};

use common_error::{SluiceError, SluiceResult};

use crate::dag::{Dag, DagOperator, OperatorId};

/// Visiting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Producers before consumers.
    Topological,
    /// Consumers before producers.
    ReverseTopological,
}

/// Callbacks invoked around every visited operator.
///
/// For an operator with an inner DAG and a recursive traversal, the inner DAG
/// is fully traversed between `on_entry` and `on_exit`.
pub trait DagVisitor {
    fn on_entry(&mut self, op: &DagOperator, dag: &Dag) -> SluiceResult<()>;

    fn on_exit(&mut self, _op: &DagOperator, _dag: &Dag) -> SluiceResult<()> {
        Ok(())
    }
}

/// Topological order of the operators of one DAG level.
pub fn topological_order(dag: &Dag) -> SluiceResult<Vec<OperatorId>> {
    let mut in_degree: BTreeMap<OperatorId, usize> =
        dag.operators().map(|op| (op.id, 0)).collect();
    for edge in dag.edges() {
        if dag.contains(edge.source) {
            if let Some(degree) = in_degree.get_mut(&edge.target) {
                *degree += 1;
            }
        }
    }

    let mut ready: BTreeSet<OperatorId> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order = Vec::with_capacity(in_degree.len());

    while let Some(id) = ready.pop_first() {
        order.push(id);
        for edge in dag.edges().iter().filter(|e| e.source == id) {
            if let Some(degree) = in_degree.get_mut(&edge.target) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(edge.target);
                }
            }
        }
    }

    if order.len() != in_degree.len() {
        let stuck: Vec<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(id, _)| id.to_string())
            .collect();
        return Err(SluiceError::cyclic_graph(format!(
            "operators [{}] are part of or downstream of a cycle",
            stuck.join(", ")
        )));
    }
    Ok(order)
}

/// Order of one DAG level in the given direction.
pub fn order(dag: &Dag, direction: Direction) -> SluiceResult<Vec<OperatorId>> {
    let mut order = topological_order(dag)?;
    if direction == Direction::ReverseTopological {
        order.reverse();
    }
    Ok(order)
}

fn check_acyclic(dag: &Dag, recurse: bool) -> SluiceResult<()> {
    topological_order(dag)?;
    if recurse {
        for op in dag.operators() {
            if let Some(inner) = op.kind.inner_dag() {
                check_acyclic(inner, true)?;
            }
        }
    }
    Ok(())
}

fn walk(
    dag: &Dag,
    direction: Direction,
    recurse: bool,
    visitor: &mut dyn DagVisitor,
) -> SluiceResult<()> {
    for id in order(dag, direction)? {
        let op = dag.get(id)?;
        visitor.on_entry(op, dag)?;
        if recurse {
            if let Some(inner) = op.kind.inner_dag() {
                walk(inner, direction, recurse, visitor)?;
            }
        }
        visitor.on_exit(op, dag)?;
    }
    Ok(())
}

/// Visit every operator once in `direction`, entering inner DAGs if `recurse`.
///
/// Visitor errors stop the traversal and are returned unchanged.
pub fn traverse(
    dag: &Dag,
    direction: Direction,
    recurse: bool,
    visitor: &mut dyn DagVisitor,
) -> SluiceResult<()> {
    check_acyclic(dag, recurse)?;
    log::trace!(
        "traversing {} operators ({direction:?}, recurse={recurse})",
        dag.len()
    );
    walk(dag, direction, recurse, visitor)
}

struct FnVisitor<E, X> {
    on_entry: E,
    on_exit: X,
}

impl<E, X> DagVisitor for FnVisitor<E, X>
where
    E: FnMut(&DagOperator, &Dag) -> SluiceResult<()>,
    X: FnMut(&DagOperator, &Dag) -> SluiceResult<()>,
{
    fn on_entry(&mut self, op: &DagOperator, dag: &Dag) -> SluiceResult<()> {
        (self.on_entry)(op, dag)
    }

    fn on_exit(&mut self, op: &DagOperator, dag: &Dag) -> SluiceResult<()> {
        (self.on_exit)(op, dag)
    }
}

fn no_exit(_: &DagOperator, _: &Dag) -> SluiceResult<()> {
    Ok(())
}

/// Apply `f` to every operator of this level, producers first.
pub fn apply_in_topological_order<F>(dag: &Dag, f: F) -> SluiceResult<()>
where
    F: FnMut(&DagOperator, &Dag) -> SluiceResult<()>,
{
    let mut visitor = FnVisitor {
        on_entry: f,
        on_exit: no_exit,
    };
    traverse(dag, Direction::Topological, false, &mut visitor)
}

/// Apply `f` to every operator of this level, consumers first.
pub fn apply_in_reverse_topological_order<F>(dag: &Dag, f: F) -> SluiceResult<()>
where
    F: FnMut(&DagOperator, &Dag) -> SluiceResult<()>,
{
    let mut visitor = FnVisitor {
        on_entry: f,
        on_exit: no_exit,
    };
    traverse(dag, Direction::ReverseTopological, false, &mut visitor)
}

/// Recursive topological traversal with entry and exit callbacks.
pub fn apply_in_topological_order_recursively<E, X>(
    dag: &Dag,
    on_entry: E,
    on_exit: X,
) -> SluiceResult<()>
where
    E: FnMut(&DagOperator, &Dag) -> SluiceResult<()>,
    X: FnMut(&DagOperator, &Dag) -> SluiceResult<()>,
{
    let mut visitor = FnVisitor { on_entry, on_exit };
    traverse(dag, Direction::Topological, true, &mut visitor)
}

/// Recursive reverse-topological traversal with entry and exit callbacks.
pub fn apply_in_reverse_topological_order_recursively<E, X>(
    dag: &Dag,
    on_entry: E,
    on_exit: X,
) -> SluiceResult<()>
where
    E: FnMut(&DagOperator, &Dag) -> SluiceResult<()>,
    X: FnMut(&DagOperator, &Dag) -> SluiceResult<()>,
{
    let mut visitor = FnVisitor { on_entry, on_exit };
    traverse(dag, Direction::ReverseTopological, true, &mut visitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Edge;
    use crate::expr::Expr;
    use crate::ops::OperatorKind;

    fn diamond() -> Dag {
        // 0 -> 1 -> 3, 0 -> 2 -> 3
        let mut dag = Dag::new();
        let src = dag.add_operator(OperatorKind::range(0, 3, 1).unwrap());
        let left = dag.add_operator(OperatorKind::map(Expr::field(0)));
        let right = dag.add_operator(OperatorKind::map(Expr::field(0)));
        let join = dag.add_operator(OperatorKind::join(1));
        dag.add_edge(src, 0, left, 0).unwrap();
        dag.add_edge(src, 0, right, 0).unwrap();
        dag.add_edge(left, 0, join, 0).unwrap();
        dag.add_edge(right, 0, join, 1).unwrap();
        dag.set_sink(join).unwrap();
        dag
    }

    #[test]
    fn test_topological_order_breaks_ties_by_id() {
        let dag = diamond();
        assert_eq!(topological_order(&dag).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_reverse_is_exact_reverse() {
        let dag = diamond();
        let mut seen = Vec::new();
        apply_in_reverse_topological_order(&dag, |op, _| {
            seen.push(op.id);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_cycle_detected_before_callbacks() {
        let mut dag = Dag::new();
        let a = dag.add_operator(OperatorKind::map(Expr::field(0)));
        let b = dag.add_operator(OperatorKind::map(Expr::field(0)));
        dag.insert_edge_unchecked(Edge::new(a, 0, b, 0));
        dag.insert_edge_unchecked(Edge::new(b, 0, a, 0));

        let mut calls = 0;
        let err = apply_in_topological_order(&dag, |_, _| {
            calls += 1;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, SluiceError::CyclicGraph(_)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_visitor_error_stops_traversal() {
        let dag = diamond();
        let mut seen = Vec::new();
        let err = apply_in_topological_order(&dag, |op, _| {
            seen.push(op.id);
            if op.id == 1 {
                return Err(SluiceError::internal("stop"));
            }
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, SluiceError::Internal(_)));
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn test_recursive_entry_exit_bracket_inner_dag() {
        let mut inner = Dag::new();
        let r = inner.add_operator(OperatorKind::range(0, 3, 1).unwrap());
        let m = inner.add_operator(OperatorKind::map(Expr::field(0).mul(Expr::int(2))));
        inner.add_edge(r, 0, m, 0).unwrap();
        inner.set_sink(m).unwrap();

        let mut outer = Dag::new();
        let p = outer.add_operator(OperatorKind::pipeline(0, inner));
        let mat = outer.add_operator(OperatorKind::materialize_row_vector());
        outer.add_edge(p, 0, mat, 0).unwrap();
        outer.set_sink(mat).unwrap();

        let events = std::cell::RefCell::new(Vec::new());
        apply_in_topological_order_recursively(
            &outer,
            |op, _| {
                events.borrow_mut().push(format!("enter {}", op.name()));
                Ok(())
            },
            |op, _| {
                events.borrow_mut().push(format!("exit {}", op.name()));
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(
            events.into_inner(),
            vec![
                "enter pipeline_0",
                "enter range_0",
                "exit range_0",
                "enter map_1",
                "exit map_1",
                "exit pipeline_0",
                "enter materialize_row_vector_1",
                "exit materialize_row_vector_1",
            ]
        );
    }

    #[test]
    fn test_non_recursive_skips_inner() {
        let mut inner = Dag::new();
        inner.add_operator(OperatorKind::range(0, 1, 1).unwrap());
        let mut outer = Dag::new();
        outer.add_operator(OperatorKind::pipeline(0, inner));

        let mut count = 0;
        apply_in_topological_order(&outer, |_, _| {
            count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 1);
    }
}
