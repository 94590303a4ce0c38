//! Atomic (leaf) field kinds.

use serde::{Deserialize, Serialize};

use common_error::{SluiceError, SluiceResult};

/// Leaf type of a tuple field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomicKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl AtomicKind {
    /// All atomic kinds, narrowest first within each family.
    pub const ALL: [Self; 7] = [
        Self::Bool,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float32,
        Self::Float64,
    ];

    /// Wire tag of this kind.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: &str) -> SluiceResult<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| SluiceError::parse(format!("unknown atomic type '{tag}'")))
    }

    /// C type used by the generated code.
    pub const fn c_type(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8_t",
            Self::Int16 => "int16_t",
            Self::Int32 => "int32_t",
            Self::Int64 => "int64_t",
            Self::Float32 => "float",
            Self::Float64 => "double",
        }
    }

    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Inclusive value range of an integer kind.
    pub const fn int_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Wrap `value` to this kind's width, the way a store into a C field of
    /// this type truncates it. Non-integer kinds leave it unchanged.
    pub const fn wrap_int(&self, value: i64) -> i64 {
        match self {
            Self::Int8 => value as i8 as i64,
            Self::Int16 => value as i16 as i64,
            Self::Int32 => value as i32 as i64,
            _ => value,
        }
    }

    /// Render a C++ literal of this kind from its decimal text.
    ///
    /// `int64` literals carry an `L` suffix, `float32` literals an `f`
    /// suffix; floating literals always contain a decimal point.
    pub fn render_literal(&self, text: &str) -> String {
        match self {
            Self::Int64 => format!("{text}L"),
            Self::Float32 | Self::Float64 => {
                let mut literal = text.to_string();
                if !literal.contains(['.', 'e', 'E']) && !literal.contains("inf") {
                    literal.push_str(".0");
                }
                if *self == Self::Float32 {
                    literal.push('f');
                }
                literal
            }
            _ => text.to_string(),
        }
    }

    /// The wider of two numeric kinds, used for arithmetic promotion.
    pub fn promote(self, other: Self) -> Option<Self> {
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }
        match (self, other) {
            (Self::Float32, Self::Float32) => Some(Self::Float32),
            // An integer operand mixed with a float widens to double.
            (a, b) if a.is_float() || b.is_float() => Some(Self::Float64),
            (a, b) => Some(a.max(b)),
        }
    }
}

impl std::fmt::Display for AtomicKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
