//! Column types and the tagged row value used at the codec/JSON boundary.
//!
//! Mirrors the shape of the teacher's own `Value` enum (`Value::load`/`save`
//! dispatch by type) but narrowed to this engine's eight column types.

use serde::{Deserialize, Serialize};

/// The fixed set of column types a schema may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    UniqueIdentifier,
    Text,
    Buffer,
    Number,
    Boolean,
    Date,
    UpdatedAt,
    Coordinates,
}

impl ColumnType {
    /// On-disk width in bytes for a column of this type, given its declared
    /// `length` (only meaningful for Text/Buffer).
    pub fn size(self, length: usize) -> usize {
        match self {
            ColumnType::UniqueIdentifier => 12,
            ColumnType::Text | ColumnType::Buffer => length + 2,
            ColumnType::Number => 8,
            ColumnType::Boolean => 1,
            ColumnType::Date => 8,
            ColumnType::UpdatedAt => 8,
            ColumnType::Coordinates => 16,
        }
    }

    /// Whether this type carries an explicit `length` (Text/Buffer).
    pub fn is_variable(self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Buffer)
    }
}

/// A single column's value. `Null` is the uniform null sentinel for every
/// nullable column, regardless of declared type (see DESIGN.md, "Null
/// handling").
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Id(String),
    Text(String),
    Buffer(Vec<u8>),
    Number(f64),
    Boolean(bool),
    Date(f64),
    UpdatedAt(f64),
    Coordinates(f64, f64),
}

impl Value {
    /// True if this value is the null sentinel.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the id string, if this is an `Id` value.
    pub fn as_id(&self) -> Option<&str> {
        match self {
            Value::Id(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the text, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Extract the number, if this is a `Number`/`Date`/`UpdatedAt` value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) | Value::Date(n) | Value::UpdatedAt(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract the number, if this is specifically a `Number` value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extract the timestamp, if this is specifically a `Date` value.
    pub fn as_date(&self) -> Option<f64> {
        match self {
            Value::Date(n) => Some(*n),
            _ => None,
        }
    }
}

/// JSON-friendly view of a `Value`, used only at serialization boundaries
/// (external interfaces stringify/parse here, per the distilled spec's
/// "Dynamic typing of row values" design note).
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Id(s) | Value::Text(s) => serializer.serialize_str(s),
            Value::Buffer(b) => serializer.serialize_str(&crate::util::hex_encode(b)),
            Value::Number(n) | Value::Date(n) | Value::UpdatedAt(n) => {
                serializer.serialize_f64(*n)
            }
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Coordinates(lat, lng) => (lat, lng).serialize(serializer),
        }
    }
}
