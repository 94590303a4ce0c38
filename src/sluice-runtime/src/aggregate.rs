//! Aggregate accumulators for group-by evaluation.

use std::cmp::Ordering;

use common_error::{SluiceError, SluiceResult};
use sluice_core::{AtomicKind, Value};
use sluice_dag::ops::{AggregateExpr, AggregateFunc};

/// Running state of one aggregate over one group.
pub(crate) trait Accumulator: Send {
    /// Feed the next value of the aggregated field; `None` for `count`.
    fn update(&mut self, value: Option<&Value>) -> SluiceResult<()>;

    /// The aggregate of every value seen so far.
    fn finalize(&self) -> Value;
}

/// Fresh accumulator for `aggregate`. `kind` is the type of the aggregated
/// field, when it is atomic.
pub(crate) fn accumulator(aggregate: &AggregateExpr, kind: Option<AtomicKind>) -> Box<dyn Accumulator> {
    match aggregate.func {
        AggregateFunc::Count => Box::new(CountAccumulator::default()),
        AggregateFunc::Sum => Box::new(SumAccumulator { kind, sum: None }),
        AggregateFunc::Min => Box::new(ExtremumAccumulator::new(Ordering::Less)),
        AggregateFunc::Max => Box::new(ExtremumAccumulator::new(Ordering::Greater)),
    }
}

#[derive(Debug, Default)]
struct CountAccumulator {
    count: i64,
}

impl Accumulator for CountAccumulator {
    fn update(&mut self, _value: Option<&Value>) -> SluiceResult<()> {
        self.count += 1;
        Ok(())
    }

    fn finalize(&self) -> Value {
        Value::Int(self.count)
    }
}

/// Integer sums wrap at the width of the summed field, like the generated
/// code's accumulator of that type.
#[derive(Debug)]
struct SumAccumulator {
    kind: Option<AtomicKind>,
    sum: Option<Value>,
}

impl Accumulator for SumAccumulator {
    fn update(&mut self, value: Option<&Value>) -> SluiceResult<()> {
        let value = value.ok_or_else(|| SluiceError::execution("sum needs a field"))?;
        self.sum = Some(match (self.sum.take(), value) {
            (None, v @ (Value::Int(_) | Value::Float(_))) => v.clone(),
            (Some(Value::Int(a)), Value::Int(b)) => {
                let sum = a.wrapping_add(*b);
                Value::Int(self.kind.map_or(sum, |kind| kind.wrap_int(sum)))
            }
            (Some(Value::Float(a)), Value::Float(b)) => Value::Float(a + b),
            (_, other) => {
                return Err(SluiceError::execution(format!(
                    "cannot sum a {} value",
                    other.type_name()
                )));
            }
        });
        Ok(())
    }

    fn finalize(&self) -> Value {
        self.sum.clone().unwrap_or(Value::Int(0))
    }
}

/// Minimum or maximum, keeping the value that compares as `keep` against
/// the current best.
#[derive(Debug)]
struct ExtremumAccumulator {
    keep: Ordering,
    best: Option<Value>,
}

impl ExtremumAccumulator {
    fn new(keep: Ordering) -> Self {
        Self { keep, best: None }
    }
}

impl Accumulator for ExtremumAccumulator {
    fn update(&mut self, value: Option<&Value>) -> SluiceResult<()> {
        let value = value.ok_or_else(|| SluiceError::execution("min/max needs a field"))?;
        let replace = match &self.best {
            None => true,
            Some(best) => compare(value, best)? == self.keep,
        };
        if replace {
            self.best = Some(value.clone());
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        self.best.clone().unwrap_or(Value::Int(0))
    }
}

fn compare(a: &Value, b: &Value) -> SluiceResult<Ordering> {
    let ordering = match (a, b) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        _ => None,
    };
    ordering.ok_or_else(|| {
        SluiceError::execution(format!(
            "cannot compare {} with {}",
            a.type_name(),
            b.type_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(aggregate: AggregateExpr, values: &[Value]) -> Value {
        run_as(aggregate, None, values)
    }

    fn run_as(aggregate: AggregateExpr, kind: Option<AtomicKind>, values: &[Value]) -> Value {
        let mut acc = accumulator(&aggregate, kind);
        for v in values {
            acc.update(Some(v)).unwrap();
        }
        acc.finalize()
    }

    #[test]
    fn test_accumulators() {
        let ints = [Value::Int(3), Value::Int(-1), Value::Int(7)];
        assert_eq!(run(AggregateExpr::count(), &ints), Value::Int(3));
        assert_eq!(run(AggregateExpr::sum(0), &ints), Value::Int(9));
        assert_eq!(run(AggregateExpr::min(0), &ints), Value::Int(-1));
        assert_eq!(run(AggregateExpr::max(0), &ints), Value::Int(7));

        let floats = [Value::Float(0.5), Value::Float(2.0)];
        assert_eq!(run(AggregateExpr::sum(0), &floats), Value::Float(2.5));
        assert_eq!(run(AggregateExpr::min(0), &floats), Value::Float(0.5));
    }

    #[test]
    fn test_sum_wraps() {
        let values = [Value::Int(i64::MAX), Value::Int(1)];
        assert_eq!(run(AggregateExpr::sum(0), &values), Value::Int(i64::MIN));

        let narrow = [Value::Int(i64::from(i32::MAX)), Value::Int(1), Value::Int(1)];
        assert_eq!(
            run_as(AggregateExpr::sum(0), Some(AtomicKind::Int32), &narrow),
            Value::Int(i64::from(i32::MIN) + 1)
        );
        assert_eq!(
            run_as(AggregateExpr::sum(0), Some(AtomicKind::Int8), &[Value::Int(100), Value::Int(100)]),
            Value::Int(-56)
        );
    }

    #[test]
    fn test_mixed_values_rejected() {
        let mut acc = accumulator(&AggregateExpr::max(0), None);
        acc.update(Some(&Value::Int(1))).unwrap();
        assert!(acc.update(Some(&Value::Bool(true))).is_err());
    }
}
