//! Projection operator for positional field selection.

use serde::{Deserialize, Serialize};

/// Projection operator - keeps the input fields at `positions`, in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionOp {
    pub positions: Vec<usize>,
}

impl ProjectionOp {
    pub fn new(positions: impl Into<Vec<usize>>) -> Self {
        Self {
            positions: positions.into(),
        }
    }

    /// Input position feeding output position `output`.
    pub fn source_of(&self, output: usize) -> Option<usize> {
        self.positions.get(output).copied()
    }

    /// Compose with a projection applied on top of this one.
    pub fn then(&self, outer: &ProjectionOp) -> Option<ProjectionOp> {
        outer
            .positions
            .iter()
            .map(|&p| self.source_of(p))
            .collect::<Option<Vec<_>>>()
            .map(ProjectionOp::new)
    }
}

impl std::fmt::Display for ProjectionOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "positions={:?}", self.positions)
    }
}
