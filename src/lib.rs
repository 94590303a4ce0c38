//! Sluice - dataflow DAG compiler
//!
//! Sluice takes an operator DAG in its JSON wire format, optimizes it and
//! fuses it into one C++ `execute` function, or evaluates it in process
//! through the plan registry.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

// Re-export core crates
pub use common_config as config;
pub use common_error as error;
pub use sluice_codegen as codegen;
pub use sluice_core as core;
pub use sluice_dag as dag;
pub use sluice_optimizer as optimizer;
pub use sluice_runtime as runtime;

/// Sluice version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
