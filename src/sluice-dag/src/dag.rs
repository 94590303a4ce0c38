//! DAG graph structure.
//!
//! Operators live in an arena keyed by integer id; edges connect an output
//! port of a producer to an input port of a consumer. Every checked mutation
//! keeps the graph acyclic and every input port bound at most once.

use std::collections::{BTreeMap, BTreeSet};

use common_error::{SluiceError, SluiceResult};
use sluice_core::{AttributeId, ColumnAllocator, Field};

use crate::ops::OperatorKind;

/// Identifier of an operator, unique within its DAG.
pub type OperatorId = usize;

/// A connection from a producer's output port to a consumer's input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub source: OperatorId,
    pub source_port: usize,
    pub target: OperatorId,
    pub target_port: usize,
}

impl Edge {
    pub const fn new(
        source: OperatorId,
        source_port: usize,
        target: OperatorId,
        target_port: usize,
    ) -> Self {
        Self {
            source,
            source_port,
            target,
            target_port,
        }
    }
}

/// The other end of an edge, seen from one operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flow {
    pub operator: OperatorId,
    pub port: usize,
}

/// An operator node together with its annotations.
#[derive(Debug, Clone)]
pub struct DagOperator {
    pub id: OperatorId,
    pub kind: OperatorKind,
    /// Inferred output schema; empty until the DAG is annotated.
    pub fields: Vec<Field>,
    /// Columns read by the operator's expressions and keys.
    pub read_set: BTreeSet<AttributeId>,
    /// Columns originated by the operator.
    pub write_set: BTreeSet<AttributeId>,
    /// Output columns nothing downstream reads.
    pub dead_set: BTreeSet<AttributeId>,
}

impl DagOperator {
    pub fn new(id: OperatorId, kind: OperatorKind) -> Self {
        Self {
            id,
            kind,
            fields: Vec::new(),
            read_set: BTreeSet::new(),
            write_set: BTreeSet::new(),
            dead_set: BTreeSet::new(),
        }
    }

    pub fn num_in_ports(&self) -> usize {
        self.kind.num_in_ports()
    }

    pub fn num_out_ports(&self) -> usize {
        self.kind.num_out_ports()
    }

    /// Display name, e.g. `filter_3`.
    pub fn name(&self) -> String {
        format!("{}_{}", self.kind.tag(), self.id)
    }

    /// Column ids of the output fields, in position order.
    pub fn column_ids(&self) -> Vec<Option<AttributeId>> {
        self.fields.iter().map(Field::column_id).collect()
    }
}

/// A directed acyclic graph of operators with a designated sink.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    operators: BTreeMap<OperatorId, DagOperator>,
    edges: Vec<Edge>,
    sink: Option<OperatorId>,
    next_id: OperatorId,
    columns: ColumnAllocator,
}

impl Dag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Add an operator under the next free id.
    pub fn add_operator(&mut self, kind: OperatorKind) -> OperatorId {
        let id = self.next_id;
        self.operators.insert(id, DagOperator::new(id, kind));
        self.next_id += 1;
        id
    }

    /// Add an operator under an explicit id.
    pub fn add_operator_with_id(&mut self, id: OperatorId, kind: OperatorKind) -> SluiceResult<()> {
        if self.operators.contains_key(&id) {
            return Err(SluiceError::invalid_parameter(format!(
                "operator id {id} is already in use"
            )));
        }
        self.operators.insert(id, DagOperator::new(id, kind));
        self.next_id = self.next_id.max(id + 1);
        Ok(())
    }

    pub fn operator(&self, id: OperatorId) -> Option<&DagOperator> {
        self.operators.get(&id)
    }

    pub fn operator_mut(&mut self, id: OperatorId) -> Option<&mut DagOperator> {
        self.operators.get_mut(&id)
    }

    /// Look up an operator, failing for unknown ids.
    pub fn get(&self, id: OperatorId) -> SluiceResult<&DagOperator> {
        self.operators
            .get(&id)
            .ok_or_else(|| SluiceError::invalid_parameter(format!("unknown operator {id}")))
    }

    /// Operators in ascending id order.
    pub fn operators(&self) -> impl Iterator<Item = &DagOperator> {
        self.operators.values()
    }

    pub fn operators_mut(&mut self) -> impl Iterator<Item = &mut DagOperator> {
        self.operators.values_mut()
    }

    pub fn operator_ids(&self) -> Vec<OperatorId> {
        self.operators.keys().copied().collect()
    }

    pub fn contains(&self, id: OperatorId) -> bool {
        self.operators.contains_key(&id)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Connect `source`'s output port to `target`'s input port.
    ///
    /// Fails with `InvalidPort` for unknown operators, out-of-arity ports or an
    /// already bound input port, and with `CyclicGraph` if the edge would close
    /// a cycle.
    pub fn add_edge(
        &mut self,
        source: OperatorId,
        source_port: usize,
        target: OperatorId,
        target_port: usize,
    ) -> SluiceResult<()> {
        let edge = Edge::new(source, source_port, target, target_port);
        self.check_ports(&edge)?;
        if self.predecessor(target, target_port).is_some() {
            return Err(SluiceError::invalid_port(format!(
                "input port {target_port} of operator {target} is already bound"
            )));
        }
        if source == target || self.reaches(target, source) {
            return Err(SluiceError::cyclic_graph(format!(
                "edge {source} -> {target} would close a cycle"
            )));
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Insert an edge without any checks; callers validate afterwards.
    pub fn insert_edge_unchecked(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Remove the edge bound to `target`'s input port, if any.
    pub fn remove_edge(&mut self, target: OperatorId, target_port: usize) -> Option<Edge> {
        let index = self
            .edges
            .iter()
            .position(|e| e.target == target && e.target_port == target_port)?;
        Some(self.edges.remove(index))
    }

    /// Remove an operator that no edge references any more.
    pub fn remove_operator(&mut self, id: OperatorId) -> SluiceResult<DagOperator> {
        let referencing = self
            .edges
            .iter()
            .filter(|e| e.source == id || e.target == id)
            .count();
        if referencing > 0 {
            return Err(SluiceError::DanglingEdge {
                id,
                edges: referencing,
            });
        }
        let op = self.operators.remove(&id).ok_or_else(|| {
            SluiceError::invalid_parameter(format!("unknown operator {id}"))
        })?;
        if self.sink == Some(id) {
            self.sink = None;
        }
        Ok(op)
    }

    /// Rebind `consumer`'s input port to a different producer.
    ///
    /// On failure the previous binding is restored.
    pub fn rewire_input(
        &mut self,
        consumer: OperatorId,
        in_port: usize,
        new_source: OperatorId,
        new_port: usize,
    ) -> SluiceResult<()> {
        let previous = self.remove_edge(consumer, in_port);
        if let Err(err) = self.add_edge(new_source, new_port, consumer, in_port) {
            if let Some(edge) = previous {
                self.edges.push(edge);
            }
            return Err(err);
        }
        Ok(())
    }

    /// Producer bound to `op`'s input `port`.
    pub fn predecessor(&self, op: OperatorId, port: usize) -> Option<OperatorId> {
        self.edges
            .iter()
            .find(|e| e.target == op && e.target_port == port)
            .map(|e| e.source)
    }

    /// Producers of `op` as `(producer, producer port)`, ordered by input port.
    pub fn in_flows(&self, op: OperatorId) -> Vec<Flow> {
        let mut incoming: Vec<&Edge> = self.edges.iter().filter(|e| e.target == op).collect();
        incoming.sort_by_key(|e| e.target_port);
        incoming
            .into_iter()
            .map(|e| Flow {
                operator: e.source,
                port: e.source_port,
            })
            .collect()
    }

    /// Consumers of `op` as `(consumer, consumer port)`, ordered by consumer.
    pub fn out_flows(&self, op: OperatorId) -> Vec<Flow> {
        let mut outgoing: Vec<Flow> = self
            .edges
            .iter()
            .filter(|e| e.source == op)
            .map(|e| Flow {
                operator: e.target,
                port: e.target_port,
            })
            .collect();
        outgoing.sort_by_key(|f| (f.operator, f.port));
        outgoing
    }

    /// Producer ids of `op` in input-port order.
    pub fn predecessors(&self, op: OperatorId) -> Vec<OperatorId> {
        self.in_flows(op).into_iter().map(|f| f.operator).collect()
    }

    /// Distinct consumer ids of `op`, ascending.
    pub fn successors(&self, op: OperatorId) -> Vec<OperatorId> {
        let set: BTreeSet<OperatorId> = self
            .edges
            .iter()
            .filter(|e| e.source == op)
            .map(|e| e.target)
            .collect();
        set.into_iter().collect()
    }

    pub fn has_inner_dag(&self, op: OperatorId) -> bool {
        self.inner_dag(op).is_some()
    }

    pub fn inner_dag(&self, op: OperatorId) -> Option<&Dag> {
        self.operators.get(&op).and_then(|o| o.kind.inner_dag())
    }

    pub fn inner_dag_mut(&mut self, op: OperatorId) -> Option<&mut Dag> {
        self.operators
            .get_mut(&op)
            .and_then(|o| o.kind.inner_dag_mut())
    }

    pub fn sink(&self) -> Option<OperatorId> {
        self.sink
    }

    pub fn set_sink(&mut self, id: OperatorId) -> SluiceResult<()> {
        self.get(id)?;
        self.sink = Some(id);
        Ok(())
    }

    /// The id the next `add_operator` call will use.
    pub fn next_id(&self) -> OperatorId {
        self.next_id
    }

    pub fn column_allocator(&mut self) -> &mut ColumnAllocator {
        &mut self.columns
    }

    /// Whether `to` is reachable from `from` along edges.
    pub fn reaches(&self, from: OperatorId, to: OperatorId) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current) {
                stack.extend(
                    self.edges
                        .iter()
                        .filter(|e| e.source == current)
                        .map(|e| e.target),
                );
            }
        }
        false
    }

    pub(crate) fn check_ports(&self, edge: &Edge) -> SluiceResult<()> {
        let source = self.operators.get(&edge.source).ok_or_else(|| {
            SluiceError::invalid_port(format!("edge source {} does not exist", edge.source))
        })?;
        let target = self.operators.get(&edge.target).ok_or_else(|| {
            SluiceError::invalid_port(format!("edge target {} does not exist", edge.target))
        })?;
        if edge.source_port >= source.num_out_ports() {
            return Err(SluiceError::invalid_port(format!(
                "{} has no output port {}",
                source.name(),
                edge.source_port
            )));
        }
        if edge.target_port >= target.num_in_ports() {
            return Err(SluiceError::invalid_port(format!(
                "{} has no input port {}",
                target.name(),
                edge.target_port
            )));
        }
        Ok(())
    }

    /// Remove every annotation, recursively.
    pub fn clear_annotations(&mut self) {
        for op in self.operators.values_mut() {
            op.fields.clear();
            op.read_set.clear();
            op.write_set.clear();
            op.dead_set.clear();
            if let Some(inner) = op.kind.inner_dag_mut() {
                inner.clear_annotations();
            }
        }
    }
}

/// Structural equality: same operator ids and configurations, same edges and
/// the same sink. Annotations and allocator state are ignored.
impl PartialEq for Dag {
    fn eq(&self, other: &Self) -> bool {
        let edges = |d: &Dag| d.edges.iter().copied().collect::<BTreeSet<_>>();
        self.sink == other.sink
            && self.operators.len() == other.operators.len()
            && self
                .operators
                .iter()
                .zip(other.operators.iter())
                .all(|((a_id, a), (b_id, b))| a_id == b_id && a.kind == b.kind)
            && edges(self) == edges(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    fn range() -> OperatorKind {
        OperatorKind::range(0, 5, 1).unwrap()
    }

    fn chain() -> (Dag, OperatorId, OperatorId, OperatorId) {
        let mut dag = Dag::new();
        let r = dag.add_operator(range());
        let f = dag.add_operator(OperatorKind::filter(Expr::field(0).gt(Expr::int(2))));
        let m = dag.add_operator(OperatorKind::materialize_row_vector());
        dag.add_edge(r, 0, f, 0).unwrap();
        dag.add_edge(f, 0, m, 0).unwrap();
        dag.set_sink(m).unwrap();
        (dag, r, f, m)
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut dag = Dag::new();
        assert_eq!(dag.add_operator(range()), 0);
        dag.add_operator_with_id(7, range()).unwrap();
        assert_eq!(dag.add_operator(range()), 8);
        assert!(dag.add_operator_with_id(7, range()).is_err());
    }

    #[test]
    fn test_flows() {
        let (dag, r, f, m) = chain();
        assert_eq!(dag.predecessor(f, 0), Some(r));
        assert_eq!(dag.in_flows(m), vec![Flow { operator: f, port: 0 }]);
        assert_eq!(dag.out_flows(r), vec![Flow { operator: f, port: 0 }]);
        assert_eq!(dag.successors(r), vec![f]);
        assert!(dag.successors(m).is_empty());
    }

    #[test]
    fn test_in_flows_ordered_by_port() {
        let mut dag = Dag::new();
        let a = dag.add_operator(range());
        let b = dag.add_operator(range());
        let j = dag.add_operator(OperatorKind::join(1));
        dag.add_edge(b, 0, j, 1).unwrap();
        dag.add_edge(a, 0, j, 0).unwrap();
        assert_eq!(dag.predecessors(j), vec![a, b]);
    }

    #[test]
    fn test_add_edge_rejects_cycle() {
        let (mut dag, r, _, m) = chain();
        let err = dag.add_edge(m, 0, r, 0).unwrap_err();
        // A range has no inputs, so the port check fires first.
        assert!(matches!(err, SluiceError::InvalidPort(_)));

        let mut dag = Dag::new();
        let a = dag.add_operator(OperatorKind::map(Expr::field(0)));
        let b = dag.add_operator(OperatorKind::map(Expr::field(0)));
        dag.add_edge(a, 0, b, 0).unwrap();
        let err = dag.add_edge(b, 0, a, 0).unwrap_err();
        assert!(matches!(err, SluiceError::CyclicGraph(_)));
        let err = dag.add_edge(a, 0, a, 0).unwrap_err();
        assert!(matches!(err, SluiceError::InvalidPort(_) | SluiceError::CyclicGraph(_)));
    }

    #[test]
    fn test_add_edge_rejects_bad_ports() {
        let (mut dag, r, f, _) = chain();
        let err = dag.add_edge(r, 1, f, 0).unwrap_err();
        assert!(matches!(err, SluiceError::InvalidPort(_)));
        // Port 0 of the filter is already bound.
        let other = dag.add_operator(range());
        let err = dag.add_edge(other, 0, f, 0).unwrap_err();
        assert!(matches!(err, SluiceError::InvalidPort(_)));
        let err = dag.add_edge(other, 0, 99, 0).unwrap_err();
        assert!(matches!(err, SluiceError::InvalidPort(_)));
    }

    #[test]
    fn test_remove_operator_with_edges_fails() {
        let (mut dag, _, f, _) = chain();
        let err = dag.remove_operator(f).unwrap_err();
        assert!(matches!(err, SluiceError::DanglingEdge { id, edges: 2 } if id == f));
        assert!(dag.contains(f));
    }

    #[test]
    fn test_remove_operator() {
        let (mut dag, r, f, m) = chain();
        dag.remove_edge(f, 0).unwrap();
        dag.remove_edge(m, 0).unwrap();
        dag.remove_operator(f).unwrap();
        assert!(!dag.contains(f));
        assert_eq!(dag.len(), 2);
        assert!(dag.successors(r).is_empty());
    }

    #[test]
    fn test_rewire_input() {
        let (mut dag, r, f, m) = chain();

        // A failed rewire restores the old binding.
        let err = dag.rewire_input(f, 0, m, 0).unwrap_err();
        assert!(matches!(err, SluiceError::CyclicGraph(_)));
        assert_eq!(dag.predecessor(f, 0), Some(r));

        dag.rewire_input(m, 0, r, 0).unwrap();
        assert_eq!(dag.predecessor(m, 0), Some(r));
        assert!(dag.successors(f).is_empty());
    }

    #[test]
    fn test_structural_equality() {
        let (a, ..) = chain();
        let (mut b, ..) = chain();
        assert_eq!(a, b);
        b.add_operator(range());
        assert_ne!(a, b);
    }

    #[test]
    fn test_inner_dag_access() {
        let (inner, ..) = chain();
        let mut dag = Dag::new();
        let p = dag.add_operator(OperatorKind::pipeline(0, inner.clone()));
        let r = dag.add_operator(range());
        assert!(dag.has_inner_dag(p));
        assert!(!dag.has_inner_dag(r));
        assert_eq!(dag.inner_dag(p), Some(&inner));
        dag.inner_dag_mut(p).unwrap().add_operator(range());
        assert_eq!(dag.inner_dag(p).unwrap().len(), 4);
    }
}
