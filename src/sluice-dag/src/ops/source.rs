//! Source operators: range, constant tuple and parameter lookup.

use serde::{Deserialize, Serialize};

use common_error::{SluiceError, SluiceResult};
use sluice_core::{FieldType, TupleType};

use crate::expr::Literal;

fn default_step() -> i64 {
    1
}

/// Range source - emits `{v0: int64}` tuples from `from` (inclusive) to `to`
/// (exclusive) in increments of `step`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeOp {
    pub from: i64,
    pub to: i64,
    #[serde(default = "default_step")]
    pub step: i64,
}

impl RangeOp {
    /// Create a new range.
    pub fn new(from: i64, to: i64, step: i64) -> SluiceResult<Self> {
        let op = Self { from, to, step };
        op.validate()?;
        Ok(op)
    }

    pub fn validate(&self) -> SluiceResult<()> {
        if self.step == 0 {
            return Err(SluiceError::invalid_parameter("range step must be non-zero"));
        }
        Ok(())
    }

    /// The values this range produces.
    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        let mut next = Some(self.from);
        std::iter::from_fn(move || {
            let current = next?;
            let in_range = if self.step > 0 {
                current < self.to
            } else {
                current > self.to
            };
            if !in_range {
                next = None;
                return None;
            }
            next = current.checked_add(self.step);
            Some(current)
        })
    }
}

impl std::fmt::Display for RangeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "from={}, to={}, step={}", self.from, self.to, self.step)
    }
}

/// Constant tuple source - emits one tuple of literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantTupleOp {
    pub values: Vec<Literal>,
}

impl ConstantTupleOp {
    pub fn new(values: Vec<Literal>) -> Self {
        Self { values }
    }

    pub fn output_type(&self) -> TupleType {
        TupleType::positional(self.values.iter().map(|v| FieldType::Atomic(v.kind())))
    }
}

impl std::fmt::Display for ConstantTupleOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<String> = self.values.iter().map(ToString::to_string).collect();
        write!(f, "values=({})", values.join(", "))
    }
}

/// Parameter lookup - reads plan input `parameter_num`.
///
/// In an outer DAG the lookup declares the input's type. Inside a pipeline it
/// binds pipeline input `parameter_num` and may leave the type to inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterLookupOp {
    pub parameter_num: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<TupleType>,
}

impl ParameterLookupOp {
    pub fn new(parameter_num: usize, output_type: TupleType) -> Self {
        Self {
            parameter_num,
            output_type: Some(output_type),
        }
    }

    /// A lookup of pipeline input `parameter_num`, typed by the pipeline.
    pub fn pipeline_input(parameter_num: usize) -> Self {
        Self {
            parameter_num,
            output_type: None,
        }
    }
}

impl std::fmt::Display for ParameterLookupOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parameter={}", self.parameter_num)?;
        if let Some(t) = &self.output_type {
            write!(f, ", type={t}")?;
        }
        Ok(())
    }
}
