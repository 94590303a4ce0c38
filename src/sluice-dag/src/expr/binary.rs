//! Binary and unary operators of operator functions.

use serde::{Deserialize, Serialize};

use sluice_core::{AtomicKind, FieldType};

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    // Arithmetic operators
    Add,
    Sub,
    Mul,
    Div,
    Rem,

    // Comparison operators
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical operators
    And,
    Or,
}

impl BinaryOp {
    /// Check if this is an arithmetic operator.
    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Rem
        )
    }

    /// Check if this is a comparison operator.
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    /// Check if this is a logical operator.
    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// C++ spelling of the operator.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Get the result type of this operator given operand types.
    ///
    /// Returns `None` if the operation is not valid for the given types.
    pub fn result_type(&self, left: &FieldType, right: &FieldType) -> Option<FieldType> {
        let (l, r) = (left.as_atomic()?, right.as_atomic()?);
        match self {
            // `%` is integral only
            Self::Rem => (l.is_integer() && r.is_integer())
                .then(|| l.promote(r))
                .flatten()
                .map(FieldType::Atomic),
            Self::Add | Self::Sub | Self::Mul | Self::Div => l.promote(r).map(FieldType::Atomic),
            Self::Eq | Self::Ne => {
                let comparable = (l == AtomicKind::Bool && r == AtomicKind::Bool)
                    || (l.is_numeric() && r.is_numeric());
                comparable.then_some(FieldType::Atomic(AtomicKind::Bool))
            }
            Self::Lt | Self::Le | Self::Gt | Self::Ge => (l.is_numeric() && r.is_numeric())
                .then_some(FieldType::Atomic(AtomicKind::Bool)),
            Self::And | Self::Or => (l == AtomicKind::Bool && r == AtomicKind::Bool)
                .then_some(FieldType::Atomic(AtomicKind::Bool)),
        }
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// Logical NOT.
    Not,
    /// Numeric negation.
    Neg,
}

impl UnaryOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Neg => "-",
        }
    }

    pub fn result_type(&self, operand: &FieldType) -> Option<FieldType> {
        match self {
            Self::Not => operand.is_bool().then(|| operand.clone()),
            Self::Neg => operand.is_numeric().then(|| operand.clone()),
        }
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INT: FieldType = FieldType::Atomic(AtomicKind::Int64);
    const FLOAT: FieldType = FieldType::Atomic(AtomicKind::Float64);
    const BOOL: FieldType = FieldType::Atomic(AtomicKind::Bool);

    #[test]
    fn test_operator_categories() {
        assert!(BinaryOp::Add.is_arithmetic());
        assert!(BinaryOp::Ge.is_comparison());
        assert!(BinaryOp::Or.is_logical());
        assert!(!BinaryOp::Eq.is_arithmetic());
    }

    #[test]
    fn test_result_types() {
        assert_eq!(BinaryOp::Add.result_type(&INT, &FLOAT), Some(FLOAT));
        assert_eq!(BinaryOp::Mul.result_type(&INT, &INT), Some(INT));
        assert_eq!(BinaryOp::Gt.result_type(&INT, &FLOAT), Some(BOOL));
        assert_eq!(BinaryOp::Eq.result_type(&BOOL, &BOOL), Some(BOOL));
        assert_eq!(BinaryOp::And.result_type(&BOOL, &BOOL), Some(BOOL));

        assert_eq!(BinaryOp::Rem.result_type(&INT, &FLOAT), None);
        assert_eq!(BinaryOp::Lt.result_type(&BOOL, &BOOL), None);
        assert_eq!(BinaryOp::And.result_type(&INT, &BOOL), None);
        assert_eq!(BinaryOp::Add.result_type(&BOOL, &INT), None);
    }

    #[test]
    fn test_unary_result_types() {
        assert_eq!(UnaryOp::Not.result_type(&BOOL), Some(BOOL));
        assert_eq!(UnaryOp::Neg.result_type(&FLOAT), Some(FLOAT));
        assert_eq!(UnaryOp::Not.result_type(&INT), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&BinaryOp::Gt).unwrap(), "\"gt\"");
        assert_eq!(serde_json::to_string(&UnaryOp::Neg).unwrap(), "\"neg\"");
    }
}
