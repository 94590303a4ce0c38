//! C++ code generation for Sluice DAGs.
//!
//! The generator walks a validated DAG producers first and fuses every
//! operator into one `execute` function over the operator templates of the
//! C++ runtime headers. Emission builds a structured [`CodeUnit`]; text is
//! rendered once at the end:
//!
//! ```text
//! Dag ──▶ infer_types ──▶ traverse(Emitter) ──▶ CodeUnit ──▶ execute.cpp / execute.h
//! ```
//!
//! The generated function has the ABI
//! `result_type *execute(void *input_0, unsigned long input_0_size, ...)`
//! with one pointer and length per outer `parameter_lookup`, and the result
//! is released with `free_result`.

pub mod declarations;
pub mod emit;
pub mod generator;
pub mod unit;

pub use declarations::TypeDeclarations;
pub use emit::{Emitter, OperatorDesc};
pub use generator::{CodeGenerator, GeneratedCode, generate};
pub use unit::{CodeUnit, Statement};
