//! Structural field and tuple types.

use serde::{Deserialize, Serialize};

use common_error::{SluiceError, SluiceResult};

use super::AtomicKind;

/// Type of a single tuple field.
///
/// Types are owned trees, so a tuple type can never contain itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Atomic(AtomicKind),
    Tuple(TupleType),
    Array(Box<FieldType>),
}

impl FieldType {
    pub const fn atomic(kind: AtomicKind) -> Self {
        Self::Atomic(kind)
    }

    pub fn array(element: FieldType) -> Self {
        Self::Array(Box::new(element))
    }

    pub const fn as_atomic(&self) -> Option<AtomicKind> {
        match self {
            Self::Atomic(kind) => Some(*kind),
            _ => None,
        }
    }

    pub const fn as_tuple(&self) -> Option<&TupleType> {
        match self {
            Self::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_array_element(&self) -> Option<&FieldType> {
        match self {
            Self::Array(element) => Some(element),
            _ => None,
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Atomic(AtomicKind::Bool))
    }

    pub const fn is_integer(&self) -> bool {
        match self {
            Self::Atomic(kind) => kind.is_integer(),
            _ => false,
        }
    }

    pub const fn is_numeric(&self) -> bool {
        match self {
            Self::Atomic(kind) => kind.is_numeric(),
            _ => false,
        }
    }

    /// C encoding of this type. Nested tuple types are named by `resolve`.
    pub fn c_type(&self, resolve: &mut dyn FnMut(&TupleType) -> String) -> String {
        match self {
            Self::Atomic(kind) => kind.c_type().to_string(),
            Self::Tuple(t) => resolve(t),
            Self::Array(element) => format!("Array<{}>", element.c_type(resolve)),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Atomic(kind) => write!(f, "{kind}"),
            Self::Tuple(t) => write!(f, "{t}"),
            Self::Array(element) => write!(f, "array<{element}>"),
        }
    }
}

/// A named slot of a tuple type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedFieldType {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl NamedFieldType {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Ordered, named list of field types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TupleType {
    fields: Vec<NamedFieldType>,
}

impl TupleType {
    /// Create a tuple type, rejecting duplicate field names.
    pub fn new(fields: Vec<NamedFieldType>) -> SluiceResult<Self> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SluiceError::schema(format!(
                    "duplicate field name '{}' in tuple type",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    /// Tuple type whose fields are named `v0..vn` in order.
    pub fn positional(types: impl IntoIterator<Item = FieldType>) -> Self {
        Self {
            fields: types
                .into_iter()
                .enumerate()
                .map(|(i, t)| NamedFieldType::new(format!("v{i}"), t))
                .collect(),
        }
    }

    /// Single-field tuple `{v0: kind}`.
    pub fn scalar(kind: AtomicKind) -> Self {
        Self::positional([FieldType::Atomic(kind)])
    }

    pub fn fields(&self) -> &[NamedFieldType] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&NamedFieldType> {
        self.fields.get(index)
    }

    pub fn field_types(&self) -> impl Iterator<Item = &FieldType> {
        self.fields.iter().map(|f| &f.field_type)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether both types have the same field types in the same order,
    /// regardless of field names.
    pub fn same_shape(&self, other: &TupleType) -> bool {
        self.len() == other.len() && self.field_types().eq(other.field_types())
    }

    /// Concatenate field types, renaming positionally.
    pub fn concat(&self, other: &TupleType) -> Self {
        Self::positional(self.field_types().chain(other.field_types()).cloned())
    }

    /// Select fields by position, renaming positionally.
    pub fn project(&self, positions: &[usize]) -> SluiceResult<Self> {
        let types = positions
            .iter()
            .map(|&p| {
                self.fields.get(p).map(|f| f.field_type.clone()).ok_or_else(|| {
                    SluiceError::schema(format!(
                        "projection position {p} out of range for {self}"
                    ))
                })
            })
            .collect::<SluiceResult<Vec<_>>>()?;
        Ok(Self::positional(types))
    }

    /// Render the structural body of this type, e.g. `{ int64_t v0; double v1; }`.
    ///
    /// Fields are emitted in declared order; nested tuple types are referenced
    /// by the name `resolve` returns for them. Identical types always render
    /// byte-identical bodies.
    pub fn compute_definition(&self, resolve: &mut dyn FnMut(&TupleType) -> String) -> String {
        let mut body = String::from("{ ");
        for field in &self.fields {
            body.push_str(&field.field_type.c_type(resolve));
            body.push(' ');
            body.push_str(&field.name);
            body.push_str("; ");
        }
        body.push('}');
        body
    }
}

impl std::fmt::Display for TupleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", field.name, field.field_type)?;
        }
        f.write_str("}")
    }
}
