//! Key/value slot payload attached to instances.
//!
//! The engine treats slots as opaque: it stores, replaces and clears them, and
//! every replacement marks the owning instance dirty. Interpretation of keys is
//! left to the domain layer.

use crate::guid::Guid;
use crate::types::Timestamp;
use std::collections::BTreeMap;

/// A single slot value.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Double(f64),
    /// UTF-8 text.
    Text(String),
    /// Reference to another entity.
    Guid(Guid),
    /// Point in time.
    Time(Timestamp),
}

/// An ordered map of slot keys to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slots {
    entries: BTreeMap<String, SlotValue>,
}

impl Slots {
    /// Creates an empty slot map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SlotValue> {
        self.entries.get(key)
    }

    /// Stores `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: SlotValue) -> Option<SlotValue> {
        self.entries.insert(key.into(), value)
    }

    /// Removes the value stored under `key`.
    pub fn remove(&mut self, key: &str) -> Option<SlotValue> {
        self.entries.remove(key)
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no slots are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates slots in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SlotValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
