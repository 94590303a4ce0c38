//! Core data model for the Sluice dataflow compiler.
//!
//! This crate provides the fundamental types shared by every stage:
//! - `AtomicKind`, `FieldType` and `TupleType` for the schema model
//! - `Column`, `AttributeId` and `ColumnAllocator` for column identity
//! - `Field` for annotated operator output slots
//! - `Value` and `Tuple` for runtime data

pub mod schema;
pub mod types;

mod proptest_utils;

// Re-export commonly used types
pub use schema::{AttributeId, Column, ColumnAllocator, Field, FieldProperty, fields_of};
pub use types::{AtomicKind, FieldType, NamedFieldType, Tuple, TupleType, Value};
