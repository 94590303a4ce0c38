//! Error types and result aliases for Sluice.
//!
//! Every crate in the workspace reports failures through [`SluiceError`];
//! compilation is a one-shot pipeline, so errors are reported and never
//! retried.

mod error;

pub use error::{SluiceError, SluiceResult};
