//! Core types for the slice store.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A named reducer: takes the current slice value and a payload, returns the
/// next value.
pub type Reducer = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// Description of one slice: its name and the value it starts with.
#[derive(Clone, Serialize, Deserialize)]
pub struct SliceDescriptor {
    /// Unique slice name.
    pub name: String,

    /// Value the slice holds right after the plan is applied.
    #[serde(default)]
    pub initial_value: Value,

    /// Reducers available to `SliceStore::dispatch` for this slice.
    #[serde(skip)]
    pub reducers: HashMap<String, Reducer>,
}

impl SliceDescriptor {
    /// Create a descriptor with no reducers.
    pub fn new(name: impl Into<String>, initial_value: Value) -> Self {
        Self {
            name: name.into(),
            initial_value,
            reducers: HashMap::new(),
        }
    }

    /// Create a descriptor from any serializable initial value.
    pub fn typed<T: Serialize>(name: impl Into<String>, initial_value: &T) -> Result<Self> {
        Ok(Self::new(name, serde_json::to_value(initial_value)?))
    }

    /// Register a named reducer.
    pub fn with_reducer<F>(mut self, name: impl Into<String>, reducer: F) -> Self
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.reducers.insert(name.into(), Arc::new(reducer));
        self
    }
}

impl fmt::Debug for SliceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reducers: Vec<&String> = self.reducers.keys().collect();
        reducers.sort();
        f.debug_struct("SliceDescriptor")
            .field("name", &self.name)
            .field("initial_value", &self.initial_value)
            .field("reducers", &reducers)
            .finish()
    }
}

/// An ordered list of slices to install, built before it is committed.
///
/// Applying the same plan twice yields the same store contents both times.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorePlan {
    slices: Vec<SliceDescriptor>,
}

impl StorePlan {
    /// Build a plan from descriptors.
    pub fn new(slices: impl IntoIterator<Item = SliceDescriptor>) -> Self {
        Self {
            slices: slices.into_iter().collect(),
        }
    }

    /// Parse a plan from a JSON array of `{"name", "initial_value"}` objects.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Add one more slice.
    pub fn with_slice(mut self, slice: SliceDescriptor) -> Self {
        self.slices.push(slice);
        self
    }

    pub fn slices(&self) -> &[SliceDescriptor] {
        &self.slices
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Point-in-time copy of every slice, ordered by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreSnapshot(pub BTreeMap<String, Value>);

impl StoreSnapshot {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub slice_count: u64,
    pub listener_count: u64,
    pub publish_count: u64,
}

/// Name of a JSON value's kind, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
