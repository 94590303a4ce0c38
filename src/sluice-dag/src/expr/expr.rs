//! Typed operator-function expressions.

use serde::{Deserialize, Serialize};

use common_error::{SluiceError, SluiceResult};
use sluice_core::{AtomicKind, FieldType, TupleType, Value};

use super::{BinaryOp, UnaryOp};

/// A literal constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Literal {
    pub const fn kind(&self) -> AtomicKind {
        match self {
            Self::Bool(_) => AtomicKind::Bool,
            Self::Int(_) => AtomicKind::Int64,
            Self::Float(_) => AtomicKind::Float64,
        }
    }

    pub fn value(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Int(*i),
            Self::Float(f) => Value::Float(*f),
        }
    }

    /// C++ literal text.
    ///
    /// `i64::MIN` has no literal spelling and non-finite doubles have none at
    /// all; they render as constant expressions, the latter over
    /// `std::numeric_limits` (see [`Literal::needs_limits`]).
    pub fn to_cpp(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i64::MIN) => "(-9223372036854775807L - 1)".to_string(),
            Self::Int(i) => self.kind().render_literal(&i.to_string()),
            Self::Float(f) if f.is_nan() => "std::numeric_limits<double>::quiet_NaN()".to_string(),
            Self::Float(f) if f.is_infinite() => format!(
                "{}std::numeric_limits<double>::infinity()",
                if *f < 0.0 { "-" } else { "" }
            ),
            Self::Float(f) => self.kind().render_literal(&format!("{f:?}")),
        }
    }

    /// Whether [`Literal::to_cpp`] refers to `std::numeric_limits`.
    pub fn needs_limits(&self) -> bool {
        matches!(self, Self::Float(f) if !f.is_finite())
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// Expression over the tuples an operator function receives.
///
/// Argument `i` is the `i`-th tuple passed to the function: the single input
/// tuple for filters and maps, the accumulator and the next tuple for
/// reductions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Field `index` of argument `arg`.
    Field { arg: usize, index: usize },
    Literal(Literal),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary { op: UnaryOp, expr: Box<Expr> },
    /// Build a tuple from the given field expressions.
    Tuple(Vec<Expr>),
}

impl Expr {
    /// Reference field `index` of the single argument.
    pub const fn field(index: usize) -> Self {
        Self::Field { arg: 0, index }
    }

    pub const fn arg_field(arg: usize, index: usize) -> Self {
        Self::Field { arg, index }
    }

    pub fn int(value: i64) -> Self {
        Self::Literal(Literal::Int(value))
    }

    pub fn float(value: f64) -> Self {
        Self::Literal(Literal::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::Literal(Literal::Bool(value))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn add(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Add, self, other)
    }

    pub fn sub(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Sub, self, other)
    }

    pub fn mul(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Mul, self, other)
    }

    pub fn rem(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Rem, self, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Lt, self, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        Self::binary(BinaryOp::Gt, self, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Self::binary(BinaryOp::And, self, other)
    }

    pub fn not(self) -> Self {
        Self::unary(UnaryOp::Not, self)
    }

    /// Infer the type of this expression against the argument tuple types.
    pub fn infer_type(&self, args: &[TupleType]) -> SluiceResult<FieldType> {
        match self {
            Self::Field { arg, index } => args
                .get(*arg)
                .and_then(|t| t.field(*index))
                .map(|f| f.field_type.clone())
                .ok_or_else(|| {
                    SluiceError::schema(format!(
                        "field {index} of argument {arg} does not exist (arguments: {})",
                        describe_args(args)
                    ))
                }),
            Self::Literal(lit) => Ok(FieldType::Atomic(lit.kind())),
            Self::Binary { op, left, right } => {
                let l = left.infer_type(args)?;
                let r = right.infer_type(args)?;
                op.result_type(&l, &r).ok_or_else(|| {
                    SluiceError::schema(format!("operator '{op}' cannot combine {l} and {r}"))
                })
            }
            Self::Unary { op, expr } => {
                let t = expr.infer_type(args)?;
                op.result_type(&t).ok_or_else(|| {
                    SluiceError::schema(format!("operator '{op}' cannot be applied to {t}"))
                })
            }
            Self::Tuple(items) => {
                let types = items
                    .iter()
                    .map(|item| item.infer_type(args))
                    .collect::<SluiceResult<Vec<_>>>()?;
                Ok(FieldType::Tuple(TupleType::positional(types)))
            }
        }
    }

    /// Every literal in this expression, left to right.
    pub fn literals(&self) -> Vec<&Literal> {
        match self {
            Self::Field { .. } => Vec::new(),
            Self::Literal(lit) => vec![lit],
            Self::Binary { left, right, .. } => {
                let mut out = left.literals();
                out.extend(right.literals());
                out
            }
            Self::Unary { expr, .. } => expr.literals(),
            Self::Tuple(items) => items.iter().flat_map(|item| item.literals()).collect(),
        }
    }

    /// All `(arg, index)` pairs this expression reads, in first-use order.
    pub fn referenced_fields(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields(&self, out: &mut Vec<(usize, usize)>) {
        match self {
            Self::Field { arg, index } => {
                if !out.contains(&(*arg, *index)) {
                    out.push((*arg, *index));
                }
            }
            Self::Literal(_) => {}
            Self::Binary { left, right, .. } => {
                left.collect_fields(out);
                right.collect_fields(out);
            }
            Self::Unary { expr, .. } => expr.collect_fields(out),
            Self::Tuple(items) => items.iter().for_each(|item| item.collect_fields(out)),
        }
    }

    /// Rewrite every field reference through `f`; `None` if any reference
    /// cannot be mapped.
    pub fn remap_fields(&self, f: &dyn Fn(usize, usize) -> Option<(usize, usize)>) -> Option<Self> {
        Some(match self {
            Self::Field { arg, index } => {
                let (arg, index) = f(*arg, *index)?;
                Self::Field { arg, index }
            }
            Self::Literal(lit) => Self::Literal(lit.clone()),
            Self::Binary { op, left, right } => Self::Binary {
                op: *op,
                left: Box::new(left.remap_fields(f)?),
                right: Box::new(right.remap_fields(f)?),
            },
            Self::Unary { op, expr } => Self::Unary {
                op: *op,
                expr: Box::new(expr.remap_fields(f)?),
            },
            Self::Tuple(items) => Self::Tuple(
                items
                    .iter()
                    .map(|item| item.remap_fields(f))
                    .collect::<Option<Vec<_>>>()?,
            ),
        })
    }

    /// Render this expression as C++ over parameters `a0`, `a1`, ...
    ///
    /// Tuple constructors are spelled with the type name `resolve` assigns.
    pub fn to_cpp(
        &self,
        args: &[TupleType],
        resolve: &mut dyn FnMut(&TupleType) -> String,
    ) -> SluiceResult<String> {
        match self {
            Self::Field { arg, index } => {
                let field = args.get(*arg).and_then(|t| t.field(*index)).ok_or_else(|| {
                    SluiceError::schema(format!("field {index} of argument {arg} does not exist"))
                })?;
                Ok(format!("a{arg}.{}", field.name))
            }
            Self::Literal(lit) => Ok(lit.to_cpp()),
            Self::Binary { op, left, right } => Ok(format!(
                "({} {op} {})",
                left.to_cpp(args, resolve)?,
                right.to_cpp(args, resolve)?
            )),
            Self::Unary { op, expr } => Ok(format!("({op}{})", expr.to_cpp(args, resolve)?)),
            Self::Tuple(items) => {
                let FieldType::Tuple(tuple_type) = self.infer_type(args)? else {
                    return Err(SluiceError::internal("tuple expression without tuple type"));
                };
                let parts = items
                    .iter()
                    .map(|item| item.to_cpp(args, resolve))
                    .collect::<SluiceResult<Vec<_>>>()?;
                Ok(format!("{}{{{}}}", resolve(&tuple_type), parts.join(", ")))
            }
        }
    }

    /// Evaluate against concrete argument tuples, with 64-bit integer
    /// arithmetic.
    pub fn eval(&self, args: &[&[Value]]) -> SluiceResult<Value> {
        self.eval_in(args, None)
    }

    /// Evaluate against argument tuples of the given types.
    ///
    /// Every integer result is wrapped to the width of its inferred kind, so
    /// `int32` arithmetic overflows the way the generated code does. Kinds
    /// narrower than `int32` compute at `int32` width, as C promotes them;
    /// they only truncate when stored into a field.
    pub fn eval_typed(&self, args: &[&[Value]], types: &[TupleType]) -> SluiceResult<Value> {
        self.eval_in(args, Some(types))
    }

    fn eval_in(&self, args: &[&[Value]], types: Option<&[TupleType]>) -> SluiceResult<Value> {
        let value = self.eval_untyped(args, types)?;
        let Value::Int(i) = value else {
            return Ok(value);
        };
        let kind = match (self, types) {
            (Self::Binary { .. } | Self::Unary { .. }, Some(types)) => {
                self.infer_type(types)?
                    .as_atomic()
                    .and_then(|k| k.promote(AtomicKind::Int32))
            }
            _ => None,
        };
        Ok(Value::Int(kind.map_or(i, |k| k.wrap_int(i))))
    }

    fn eval_untyped(&self, args: &[&[Value]], types: Option<&[TupleType]>) -> SluiceResult<Value> {
        match self {
            Self::Field { arg, index } => args
                .get(*arg)
                .and_then(|values| values.get(*index))
                .cloned()
                .ok_or_else(|| {
                    SluiceError::execution(format!("field {index} of argument {arg} is missing"))
                }),
            Self::Literal(lit) => Ok(lit.value()),
            Self::Binary { op, left, right } => {
                // Short-circuit like the generated code does.
                if op.is_logical() {
                    let l = as_bool(&left.eval_in(args, types)?)?;
                    return match (op, l) {
                        (BinaryOp::And, false) => Ok(Value::Bool(false)),
                        (BinaryOp::Or, true) => Ok(Value::Bool(true)),
                        _ => Ok(Value::Bool(as_bool(&right.eval_in(args, types)?)?)),
                    };
                }
                eval_binary(*op, &left.eval_in(args, types)?, &right.eval_in(args, types)?)
            }
            Self::Unary { op, expr } => match (op, expr.eval_in(args, types)?) {
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
                (UnaryOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
                (op, v) => Err(SluiceError::execution(format!(
                    "operator '{op}' cannot be applied to {}",
                    v.type_name()
                ))),
            },
            Self::Tuple(items) => items
                .iter()
                .map(|item| item.eval_in(args, types))
                .collect::<SluiceResult<Vec<_>>>()
                .map(Value::Tuple),
        }
    }
}

fn describe_args(args: &[TupleType]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn as_bool(value: &Value) -> SluiceResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| SluiceError::execution(format!("expected bool, found {}", value.type_name())))
}

fn eval_binary(op: BinaryOp, left: &Value, right: &Value) -> SluiceResult<Value> {
    if let (Value::Int(l), Value::Int(r)) = (left, right) {
        let (l, r) = (*l, *r);
        return Ok(match op {
            BinaryOp::Add => Value::Int(l.wrapping_add(r)),
            BinaryOp::Sub => Value::Int(l.wrapping_sub(r)),
            BinaryOp::Mul => Value::Int(l.wrapping_mul(r)),
            BinaryOp::Div | BinaryOp::Rem if r == 0 => {
                return Err(SluiceError::execution("integer division by zero"));
            }
            BinaryOp::Div => Value::Int(l.wrapping_div(r)),
            BinaryOp::Rem => Value::Int(l.wrapping_rem(r)),
            BinaryOp::Eq => Value::Bool(l == r),
            BinaryOp::Ne => Value::Bool(l != r),
            BinaryOp::Lt => Value::Bool(l < r),
            BinaryOp::Le => Value::Bool(l <= r),
            BinaryOp::Gt => Value::Bool(l > r),
            BinaryOp::Ge => Value::Bool(l >= r),
            BinaryOp::And | BinaryOp::Or => {
                return Err(SluiceError::execution(format!("'{op}' requires bool operands")));
            }
        });
    }

    if let (Value::Bool(l), Value::Bool(r)) = (left, right) {
        return match op {
            BinaryOp::Eq => Ok(Value::Bool(l == r)),
            BinaryOp::Ne => Ok(Value::Bool(l != r)),
            _ => Err(SluiceError::execution(format!(
                "'{op}' cannot be applied to bool operands"
            ))),
        };
    }

    let (Some(l), Some(r)) = (left.as_float(), right.as_float()) else {
        return Err(SluiceError::execution(format!(
            "'{op}' cannot combine {} and {}",
            left.type_name(),
            right.type_name()
        )));
    };
    Ok(match op {
        BinaryOp::Add => Value::Float(l + r),
        BinaryOp::Sub => Value::Float(l - r),
        BinaryOp::Mul => Value::Float(l * r),
        BinaryOp::Div => Value::Float(l / r),
        BinaryOp::Rem => Value::Float(l % r),
        BinaryOp::Eq => Value::Bool(l == r),
        BinaryOp::Ne => Value::Bool(l != r),
        BinaryOp::Lt => Value::Bool(l < r),
        BinaryOp::Le => Value::Bool(l <= r),
        BinaryOp::Gt => Value::Bool(l > r),
        BinaryOp::Ge => Value::Bool(l >= r),
        BinaryOp::And | BinaryOp::Or => {
            return Err(SluiceError::execution(format!("'{op}' requires bool operands")));
        }
    })
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field { arg, index } => write!(f, "${arg}.{index}"),
            Self::Literal(lit) => write!(f, "{lit}"),
            Self::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::Unary { op, expr } => write!(f, "{op}{expr}"),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}
