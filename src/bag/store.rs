//! Typed value store
//!
//! An [`AttributeBag`] holds at most one value per attribute name. Setting a
//! name again with the same kind overwrites it in place; setting it with a
//! different kind is refused until the name is cleared.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::string_map::StringMap;
use super::time::{Duration, Timestamp};
use super::value::{Value, ValueKind};

/// Errors from mutating a bag
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BagError {
    /// The name already holds a value of another kind
    #[error("attribute {name:?} holds a {existing} value, cannot set {attempted}")]
    TypeConflict {
        name: String,
        existing: ValueKind,
        attempted: ValueKind,
    },

    /// A timestamp or duration whose nanos are out of range or disagree in sign
    #[error("attribute {name:?} holds an invalid {kind} value")]
    InvalidValue { name: String, kind: ValueKind },
}

/// Insertion-ordered set of typed attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeBag {
    values: IndexMap<String, Value>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: IndexMap::with_capacity(capacity),
        }
    }

    /// Store `value` under `name`
    ///
    /// Leaves the bag unchanged and returns `TypeConflict` if `name` holds a
    /// value of a different kind, or `InvalidValue` for an out-of-range
    /// timestamp or duration.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), BagError> {
        let name = name.into();
        let value = value.into();

        if !value.is_valid() {
            return Err(BagError::InvalidValue {
                kind: value.kind(),
                name,
            });
        }
        if let Some(existing) = self.values.get(&name) {
            if existing.kind() != value.kind() {
                return Err(BagError::TypeConflict {
                    existing: existing.kind(),
                    attempted: value.kind(),
                    name,
                });
            }
        }
        self.values.insert(name, value);
        Ok(())
    }

    pub fn set_string(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), BagError> {
        self.set(name, Value::String(value.into()))
    }

    pub fn set_int64(&mut self, name: impl Into<String>, value: i64) -> Result<(), BagError> {
        self.set(name, Value::Int64(value))
    }

    pub fn set_double(&mut self, name: impl Into<String>, value: f64) -> Result<(), BagError> {
        self.set(name, Value::Double(value))
    }

    pub fn set_bool(&mut self, name: impl Into<String>, value: bool) -> Result<(), BagError> {
        self.set(name, Value::Bool(value))
    }

    pub fn set_timestamp(&mut self, name: impl Into<String>, value: Timestamp) -> Result<(), BagError> {
        self.set(name, Value::Timestamp(value))
    }

    pub fn set_duration(&mut self, name: impl Into<String>, value: Duration) -> Result<(), BagError> {
        self.set(name, Value::Duration(value))
    }

    pub fn set_bytes(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Result<(), BagError> {
        self.set(name, Value::Bytes(value.into()))
    }

    pub fn set_string_map(&mut self, name: impl Into<String>, value: StringMap) -> Result<(), BagError> {
        self.set(name, Value::StringMap(value))
    }

    /// Remove `name`, keeping the order of the remaining attributes
    pub fn clear(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    /// Store `value` regardless of the kind currently held, returning the old value
    ///
    /// No range check; the encoder refuses invalid values.
    pub fn replace(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.values.get(name).map(Value::kind)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_int64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int64)
    }

    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_double)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    pub fn get_timestamp(&self, name: &str) -> Option<Timestamp> {
        self.get(name).and_then(Value::as_timestamp)
    }

    pub fn get_duration(&self, name: &str) -> Option<Duration> {
        self.get(name).and_then(Value::as_duration)
    }

    pub fn get_bytes(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(Value::as_bytes)
    }

    pub fn get_string_map(&self, name: &str) -> Option<&StringMap> {
        self.get(name).and_then(Value::as_string_map)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Attribute names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Attributes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Visit every attribute in insertion order
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, &Value),
    {
        for (name, value) in &self.values {
            visitor(name, value);
        }
    }
}

impl TryFrom<IndexMap<String, Value>> for AttributeBag {
    type Error = BagError;

    fn try_from(values: IndexMap<String, Value>) -> Result<Self, Self::Error> {
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_valid()) {
            return Err(BagError::InvalidValue {
                name: name.clone(),
                kind: value.kind(),
            });
        }
        Ok(Self { values })
    }
}

impl<'de> Deserialize<'de> for AttributeBag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = IndexMap::<String, Value>::deserialize(deserializer)?;
        Self::try_from(values).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a AttributeBag {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
