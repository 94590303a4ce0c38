//! Runtime value representation.

use serde_json::Value as Json;

use common_error::{SluiceError, SluiceResult};

use super::{AtomicKind, FieldType, TupleType};

/// Runtime value of one tuple field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    /// Any integer kind; the declared kind bounds its range.
    Int(i64),
    /// Any floating kind.
    Float(f64),
    Tuple(Vec<Value>),
    Array(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Self::Tuple(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Get the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Tuple(_) => "tuple",
            Self::Array(_) => "array",
        }
    }

    /// Build a value of `field_type` from its JSON encoding.
    ///
    /// Tuples are JSON arrays of their field values, arrays are JSON arrays of
    /// their elements. Integers must fit the declared width.
    pub fn from_json(json: &Json, field_type: &FieldType) -> SluiceResult<Self> {
        match field_type {
            FieldType::Atomic(AtomicKind::Bool) => json
                .as_bool()
                .map(Self::Bool)
                .ok_or_else(|| mismatch(json, field_type)),
            FieldType::Atomic(kind) if kind.is_integer() => {
                let i = json.as_i64().ok_or_else(|| mismatch(json, field_type))?;
                let (min, max) = kind.int_range().unwrap_or((i64::MIN, i64::MAX));
                if i < min || i > max {
                    return Err(SluiceError::parse(format!("{i} does not fit in {kind}")));
                }
                Ok(Self::Int(i))
            }
            FieldType::Atomic(_) => json
                .as_f64()
                .map(Self::Float)
                .ok_or_else(|| mismatch(json, field_type)),
            FieldType::Tuple(t) => Ok(Self::Tuple(Tuple::from_json(json, t)?.values)),
            FieldType::Array(element) => {
                let items = json.as_array().ok_or_else(|| mismatch(json, field_type))?;
                items
                    .iter()
                    .map(|item| Self::from_json(item, element))
                    .collect::<SluiceResult<Vec<_>>>()
                    .map(Self::Array)
            }
        }
    }

    /// JSON encoding of this value.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Self::Tuple(values) | Self::Array(values) => {
                Json::Array(values.iter().map(Self::to_json).collect())
            }
        }
    }

    /// Check that this value inhabits `field_type`.
    pub fn conforms_to(&self, field_type: &FieldType) -> bool {
        match (self, field_type) {
            (Self::Bool(_), FieldType::Atomic(AtomicKind::Bool)) => true,
            (Self::Int(i), FieldType::Atomic(kind)) if kind.is_integer() => kind
                .int_range()
                .is_some_and(|(min, max)| *i >= min && *i <= max),
            (Self::Float(_), FieldType::Atomic(kind)) => kind.is_float(),
            (Self::Tuple(values), FieldType::Tuple(t)) => {
                values.len() == t.len()
                    && values.iter().zip(t.field_types()).all(|(v, ft)| v.conforms_to(ft))
            }
            (Self::Array(items), FieldType::Array(element)) => {
                items.iter().all(|item| item.conforms_to(element))
            }
            _ => false,
        }
    }

    /// Convert this value the way storing it into a C field of `field_type`
    /// does: integers wrap to the field's width, integers stored into
    /// floating fields convert, and `float32` fields round to single
    /// precision. Values that do not match the field's shape are returned
    /// unchanged.
    pub fn store_as(self, field_type: &FieldType) -> Self {
        match (self, field_type) {
            (Self::Int(i), FieldType::Atomic(kind)) if kind.is_integer() => {
                Self::Int(kind.wrap_int(i))
            }
            (Self::Int(i), FieldType::Atomic(kind)) if kind.is_float() => {
                Self::Float(i as f64).store_as(field_type)
            }
            (Self::Float(f), FieldType::Atomic(AtomicKind::Float32)) => {
                Self::Float(f64::from(f as f32))
            }
            (Self::Tuple(values), FieldType::Tuple(t)) if values.len() == t.len() => Self::Tuple(
                values
                    .into_iter()
                    .zip(t.field_types())
                    .map(|(v, ft)| v.store_as(ft))
                    .collect(),
            ),
            (Self::Array(items), FieldType::Array(element)) => {
                Self::Array(items.into_iter().map(|item| item.store_as(element)).collect())
            }
            (value, _) => value,
        }
    }
}

fn mismatch(json: &Json, field_type: &FieldType) -> SluiceError {
    SluiceError::parse(format!("expected a value of type {field_type}, found {json}"))
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// A typed runtime tuple: its type plus one owned value per field.
///
/// Tuples are built whole and copied whole; fields are never mutated in
/// place after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    tuple_type: TupleType,
    values: Vec<Value>,
}

impl Tuple {
    /// Create a tuple, checking every value against its field type.
    pub fn new(tuple_type: TupleType, values: Vec<Value>) -> SluiceResult<Self> {
        if values.len() != tuple_type.len() {
            return Err(SluiceError::schema(format!(
                "tuple of type {tuple_type} needs {} values, got {}",
                tuple_type.len(),
                values.len()
            )));
        }
        for (value, field) in values.iter().zip(tuple_type.fields()) {
            if !value.conforms_to(&field.field_type) {
                return Err(SluiceError::schema(format!(
                    "value {value} does not conform to field '{}' of type {}",
                    field.name, field.field_type
                )));
            }
        }
        Ok(Self { tuple_type, values })
    }

    /// Type-directed deserialization from a JSON array of field values.
    pub fn from_json(json: &Json, tuple_type: &TupleType) -> SluiceResult<Self> {
        let items = json.as_array().ok_or_else(|| {
            SluiceError::parse(format!("expected a tuple of type {tuple_type}, found {json}"))
        })?;
        if items.len() != tuple_type.len() {
            return Err(SluiceError::parse(format!(
                "expected {} fields for {tuple_type}, found {}",
                tuple_type.len(),
                items.len()
            )));
        }
        let values = items
            .iter()
            .zip(tuple_type.field_types())
            .map(|(item, ft)| Value::from_json(item, ft))
            .collect::<SluiceResult<Vec<_>>>()?;
        Ok(Self {
            tuple_type: tuple_type.clone(),
            values,
        })
    }

    pub fn to_json(&self) -> Json {
        Json::Array(self.values.iter().map(Value::to_json).collect())
    }

    pub fn tuple_type(&self) -> &TupleType {
        &self.tuple_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
