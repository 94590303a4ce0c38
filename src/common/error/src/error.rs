//! Core error types for Sluice.

use thiserror::Error;

/// Result type alias using `SluiceError`.
pub type SluiceResult<T> = std::result::Result<T, SluiceError>;

/// Core error type for Sluice operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SluiceError {
    /// Malformed input document.
    #[error("ParseError: {0}")]
    Parse(String),

    /// An `op` tag that no registered factory knows.
    #[error("UnknownOperatorError: unknown operator tag '{tag}'")]
    UnknownOperator { tag: String },

    /// Operator input/output types are incompatible.
    #[error("SchemaError: {0}")]
    Schema(String),

    /// The graph contains a cycle.
    #[error("CyclicGraphError: {0}")]
    CyclicGraph(String),

    /// An optimizer pass produced a graph that violates DAG invariants.
    #[error("InvalidRewriteError: pass '{pass}' produced an invalid graph: {reason}")]
    InvalidRewrite { pass: String, reason: String },

    /// An operator was removed while edges still reference it.
    #[error("DanglingEdgeError: operator {id} is still referenced by {edges} edge(s)")]
    DanglingEdge { id: usize, edges: usize },

    /// An edge refers to a port outside the operator's arity, or a port is bound twice.
    #[error("InvalidPortError: {0}")]
    InvalidPort(String),

    /// The code generator has no emission rule for an operator kind.
    #[error("UnsupportedOperatorError: no code emission rule for operator {id} ({kind})")]
    UnsupportedOperator { id: usize, kind: String },

    /// An operator was generated before one of its predecessors.
    #[error("UnboundVariableError: predecessor {id} has no generated variable")]
    UnboundVariable { id: usize },

    /// Invalid parameter provided.
    #[error("InvalidParameter: {0}")]
    InvalidParameter(String),

    /// Plan execution error.
    #[error("ExecutionError: {0}")]
    Execution(String),

    /// Internal error (bug in Sluice).
    #[error("InternalError: {0}")]
    Internal(String),

    /// IO error.
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

impl SluiceError {
    /// Create a new `Parse` error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new `UnknownOperator` error.
    pub fn unknown_operator<S: Into<String>>(tag: S) -> Self {
        Self::UnknownOperator { tag: tag.into() }
    }

    /// Create a new `Schema` error.
    pub fn schema<S: Into<String>>(msg: S) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a new `CyclicGraph` error.
    pub fn cyclic_graph<S: Into<String>>(msg: S) -> Self {
        Self::CyclicGraph(msg.into())
    }

    /// Create a new `InvalidRewrite` error.
    pub fn invalid_rewrite<P: Into<String>, R: Into<String>>(pass: P, reason: R) -> Self {
        Self::InvalidRewrite {
            pass: pass.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `InvalidPort` error.
    pub fn invalid_port<S: Into<String>>(msg: S) -> Self {
        Self::InvalidPort(msg.into())
    }

    /// Create a new `UnsupportedOperator` error.
    pub fn unsupported_operator<S: Into<String>>(id: usize, kind: S) -> Self {
        Self::UnsupportedOperator {
            id,
            kind: kind.into(),
        }
    }

    /// Create a new `InvalidParameter` error.
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new `Execution` error.
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a new `Internal` error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error was raised while reading an input document.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Parse(_) | Self::UnknownOperator { .. } | Self::SerdeJson(_)
        )
    }

    /// Whether this error reports a violated graph invariant.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Self::CyclicGraph(_)
                | Self::InvalidRewrite { .. }
                | Self::DanglingEdge { .. }
                | Self::InvalidPort(_)
        )
    }
}

/// Ensure a condition holds, returning an `Internal` error if not.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::SluiceError::Internal($msg.to_string()));
        }
    };
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::SluiceError::$variant(format!($($msg)*)));
        }
    };
}

/// Return early with a `Schema` error.
#[macro_export]
macro_rules! schema_err {
    ($($arg:tt)*) => {
        return Err($crate::SluiceError::Schema(format!($($arg)*)))
    };
}

/// Return early with a `Parse` error.
#[macro_export]
macro_rules! parse_err {
    ($($arg:tt)*) => {
        return Err($crate::SluiceError::Parse(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_positive(n: i64) -> SluiceResult<i64> {
        ensure!(n > 0, InvalidParameter: "expected a positive value, got {}", n);
        Ok(n)
    }

    fn always_schema_error() -> SluiceResult<()> {
        schema_err!("join key types differ: {} vs {}", "int64", "double");
    }

    #[test]
    fn test_error_display() {
        let err = SluiceError::schema("filter predicate must be bool");
        assert_eq!(err.to_string(), "SchemaError: filter predicate must be bool");

        let err = SluiceError::unknown_operator("frobnicate");
        assert_eq!(
            err.to_string(),
            "UnknownOperatorError: unknown operator tag 'frobnicate'"
        );

        let err = SluiceError::unsupported_operator(4, "partition");
        assert!(err.to_string().contains("operator 4 (partition)"));
    }

    #[test]
    fn test_error_categories() {
        assert!(SluiceError::parse("bad").is_parse_error());
        assert!(SluiceError::unknown_operator("x").is_parse_error());
        assert!(!SluiceError::schema("x").is_parse_error());

        assert!(SluiceError::cyclic_graph("x").is_graph_error());
        assert!(SluiceError::DanglingEdge { id: 1, edges: 2 }.is_graph_error());
        assert!(SluiceError::invalid_rewrite("p", "r").is_graph_error());
        assert!(!SluiceError::execution("x").is_graph_error());
    }

    #[test]
    fn test_macros() {
        assert_eq!(check_positive(3).unwrap(), 3);
        let err = check_positive(-1).unwrap_err();
        assert!(matches!(err, SluiceError::InvalidParameter(_)));

        let err = always_schema_error().unwrap_err();
        assert!(err.to_string().contains("int64 vs double"));
    }

    #[test]
    fn test_from_serde_json() {
        let err: SluiceError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(err.is_parse_error());
    }
}
