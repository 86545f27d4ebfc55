//! Resource identifiers and persisted field values.
//!
//! # Invariants
//! - A sequence value only ever holds strings.
//! - Objects and nulls are never persisted as field values.

use serde_json::Value;
use uuid::Uuid;

/// Identifier of a resource owned by the host content store.
pub type ResourceId = Uuid;

/// Persisted value of one resource field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// String, number or boolean, stored as submitted.
    Scalar(Value),
    /// Ordered collection of strings.
    Sequence(Vec<String>),
}

impl FieldValue {
    /// Classifies one submitted form value.
    ///
    /// Returns `None` for structures that cannot be persisted: `null`,
    /// objects, and arrays holding anything other than strings.
    pub fn from_submitted(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                Some(Self::Scalar(value.clone()))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .map(Self::Sequence),
            Value::Null | Value::Object(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::Sequence(items) => Value::from(items.clone()),
        }
    }
}
