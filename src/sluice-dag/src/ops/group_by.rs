//! Group-by with aggregates.

use serde::{Deserialize, Serialize};

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunc {
    Count,
    Sum,
    Min,
    Max,
}

impl AggregateFunc {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// One aggregate column: a function over an input field.
///
/// `count` takes no field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateExpr {
    pub func: AggregateFunc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<usize>,
}

impl AggregateExpr {
    pub const fn count() -> Self {
        Self {
            func: AggregateFunc::Count,
            field: None,
        }
    }

    pub const fn sum(field: usize) -> Self {
        Self {
            func: AggregateFunc::Sum,
            field: Some(field),
        }
    }

    pub const fn min(field: usize) -> Self {
        Self {
            func: AggregateFunc::Min,
            field: Some(field),
        }
    }

    pub const fn max(field: usize) -> Self {
        Self {
            func: AggregateFunc::Max,
            field: Some(field),
        }
    }
}

impl std::fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.field {
            Some(field) => write!(f, "{}(${field})", self.func.name()),
            None => write!(f, "{}(*)", self.func.name()),
        }
    }
}

/// Group by - one output tuple per distinct key, key fields followed by the
/// aggregates, in first-seen key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupByOp {
    pub keys: Vec<usize>,
    #[serde(default)]
    pub aggregates: Vec<AggregateExpr>,
}

impl GroupByOp {
    pub fn new(keys: impl Into<Vec<usize>>) -> Self {
        Self {
            keys: keys.into(),
            aggregates: Vec::new(),
        }
    }

    pub fn with_aggregate(mut self, aggregate: AggregateExpr) -> Self {
        self.aggregates.push(aggregate);
        self
    }
}

impl std::fmt::Display for GroupByOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let aggs: Vec<String> = self.aggregates.iter().map(ToString::to_string).collect();
        write!(f, "keys={:?}, aggregates=[{}]", self.keys, aggs.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_display() {
        let op = GroupByOp::new([0])
            .with_aggregate(AggregateExpr::count())
            .with_aggregate(AggregateExpr::sum(1));
        assert_eq!(op.to_string(), "keys=[0], aggregates=[count(*), sum($1)]");
    }

    #[test]
    fn test_aggregate_wire() {
        let agg: AggregateExpr = serde_json::from_str(r#"{"func": "max", "field": 2}"#).unwrap();
        assert_eq!(agg, AggregateExpr::max(2));
        let count = serde_json::to_string(&AggregateExpr::count()).unwrap();
        assert_eq!(count, r#"{"func":"count"}"#);
    }
}
