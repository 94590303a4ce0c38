//! Column identities and operator output fields.

mod column;
mod field;

pub use column::{AttributeId, Column, ColumnAllocator};
pub use field::{Field, FieldProperty, fields_of};
