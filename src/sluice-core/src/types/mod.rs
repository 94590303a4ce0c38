//! Type system for Sluice values.
//!
//! `AtomicKind`, `FieldType` and `TupleType` describe the schema an operator
//! produces; `Value` and `Tuple` carry concrete runtime data of those types.

mod atomic;
mod field_type;
mod value;

pub use atomic::AtomicKind;
pub use field_type::{FieldType, NamedFieldType, TupleType};
pub use value::{Tuple, Value};
