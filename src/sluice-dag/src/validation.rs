//! Structural validation of a DAG and its inner DAGs.

use std::collections::BTreeSet;

use common_error::{SluiceError, SluiceResult};

use crate::dag::Dag;
use crate::ops::OperatorKind;
use crate::traversal::topological_order;

impl Dag {
    /// Check the full invariant set, recursively.
    ///
    /// Every edge connects existing operators within their port arity, every
    /// input port is bound exactly once, the graph is acyclic, the sink is
    /// set, and every operator configuration is valid. Parameter lookups in
    /// an inner DAG must refer to an input of the enclosing pipeline.
    pub fn validate(&self) -> SluiceResult<()> {
        self.validate_level(None)
    }

    fn validate_level(&self, pipeline_inputs: Option<usize>) -> SluiceResult<()> {
        let mut bound = BTreeSet::new();
        for edge in self.edges() {
            self.check_ports(edge)?;
            if !bound.insert((edge.target, edge.target_port)) {
                return Err(SluiceError::invalid_port(format!(
                    "input port {} of operator {} is bound more than once",
                    edge.target_port, edge.target
                )));
            }
        }

        for op in self.operators() {
            for port in 0..op.num_in_ports() {
                if !bound.contains(&(op.id, port)) {
                    return Err(SluiceError::invalid_port(format!(
                        "input port {port} of {} is not bound",
                        op.name()
                    )));
                }
            }
            op.kind.validate_config()?;

            match &op.kind {
                OperatorKind::ParameterLookup(lookup) => {
                    if let Some(num_inputs) = pipeline_inputs {
                        if lookup.parameter_num >= num_inputs {
                            return Err(SluiceError::invalid_parameter(format!(
                                "{} reads input {} of a pipeline with {num_inputs} input(s)",
                                op.name(),
                                lookup.parameter_num
                            )));
                        }
                    }
                }
                OperatorKind::Pipeline(pipeline) => pipeline
                    .inner_dag
                    .validate_level(Some(pipeline.num_inputs))
                    .map_err(|e| match e {
                        SluiceError::InvalidParameter(msg) => SluiceError::invalid_parameter(
                            format!("in {}: {msg}", op.name()),
                        ),
                        other => other,
                    })?,
                _ => {}
            }
        }

        topological_order(self)?;

        match self.sink() {
            Some(sink) if self.contains(sink) => Ok(()),
            Some(sink) => Err(SluiceError::invalid_parameter(format!(
                "sink {sink} does not exist"
            ))),
            None => Err(SluiceError::invalid_parameter("DAG has no sink")),
        }
    }
}
