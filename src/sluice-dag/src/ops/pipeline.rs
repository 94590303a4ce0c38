//! Pipeline operator owning a nested DAG.

use crate::dag::Dag;

/// Pipeline - a sub-plan with `num_inputs` inputs.
///
/// Inside the inner DAG, `parameter_lookup` with `parameter_num = i` binds
/// pipeline input `i`; the pipeline produces its inner sink's output.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOp {
    pub num_inputs: usize,
    pub inner_dag: Dag,
}

impl PipelineOp {
    pub fn new(num_inputs: usize, inner_dag: Dag) -> Self {
        Self {
            num_inputs,
            inner_dag,
        }
    }
}

impl std::fmt::Display for PipelineOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "num_inputs={}, operators={}",
            self.num_inputs,
            self.inner_dag.len()
        )
    }
}
