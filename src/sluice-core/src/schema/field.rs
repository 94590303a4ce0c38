//! Operator output fields.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{AttributeId, Column};
use crate::types::{FieldType, TupleType};

/// Physical property a field is known to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldProperty {
    Grouped,
    Sorted,
    Unique,
}

impl std::fmt::Display for FieldProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Grouped => "grouped",
            Self::Sorted => "sorted",
            Self::Unique => "unique",
        })
    }
}

/// One output slot of an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub position: usize,
    pub name: String,
    pub field_type: FieldType,
    pub column: Option<Arc<Column>>,
    pub properties: BTreeSet<FieldProperty>,
}

impl Field {
    pub fn new(position: usize, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            position,
            name: name.into(),
            field_type,
            column: None,
            properties: BTreeSet::new(),
        }
    }

    pub fn with_column(mut self, column: Arc<Column>) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_properties(mut self, properties: impl IntoIterator<Item = FieldProperty>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn column_id(&self) -> Option<AttributeId> {
        self.column.as_ref().map(|c| c.id())
    }

    pub fn has_property(&self, property: FieldProperty) -> bool {
        self.properties.contains(&property)
    }
}

/// Unannotated fields for every slot of a tuple type.
pub fn fields_of(tuple_type: &TupleType) -> Vec<Field> {
    tuple_type
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| Field::new(i, f.name.clone(), f.field_type.clone()))
        .collect()
}
