//! Attribute bags and change sets.
//!
//! Assets and components carry an arbitrary JSON attribute bag. Updates go
//! through an [`AttributeChangeSet`] so the store can tell whether anything
//! actually changed: a change set that leaves the bag identical must not
//! advance the record's last-updated time.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON attribute bag keyed by flat attribute names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(serde_json::Map<String, Value>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single attribute mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeChange {
    Set { key: String, value: Value },
    Remove { key: String },
}

/// An ordered list of attribute mutations applied atomically to one record.
#[derive(Clone, Debug, Default)]
pub struct AttributeChangeSet {
    changes: Vec<AttributeChange>,
}

impl AttributeChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.changes.push(AttributeChange::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.changes.push(AttributeChange::Remove { key: key.into() });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Apply all changes to `attributes`, reporting whether any of them
    /// altered the bag.
    pub fn apply(&self, attributes: &mut Attributes) -> bool {
        let mut changed = false;
        for change in &self.changes {
            changed |= match change {
                AttributeChange::Set { key, value } => {
                    if attributes.0.get(key) == Some(value) {
                        false
                    } else {
                        attributes.0.insert(key.clone(), value.clone());
                        true
                    }
                }
                AttributeChange::Remove { key } => attributes.0.remove(key).is_some(),
            };
        }
        changed
    }
}
