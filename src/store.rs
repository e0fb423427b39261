//! Main SliceStore struct tying the slice map and the channel together.

use crate::error::{Result, SliceError};
use crate::state::merge_value;
use crate::subscriptions::{
    ReceiverConfig, SliceChannel, SliceReceiver, Subscription, SubscriptionId,
    DEFAULT_LISTENER_WARN_THRESHOLD,
};
use crate::types::{Reducer, SliceDescriptor, StorePlan, StoreSnapshot, StoreStats};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Listener count on a single slice at which a warning is logged.
    pub listener_warn_threshold: usize,

    /// Whether `merge` on an absent slice starts from an empty object
    /// instead of failing.
    pub merge_missing_as_empty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            listener_warn_threshold: DEFAULT_LISTENER_WARN_THRESHOLD,
            merge_missing_as_empty: false,
        }
    }
}

/// The slice store.
///
/// Provides a unified interface for:
/// - Installing slices from a plan
/// - Reading and writing slice values
/// - Structured updates (merge, reducers)
/// - Subscribing to slice changes
///
/// Every write publishes on the store's channel after the new value is in
/// place, so listeners always observe the post-write value.
pub struct SliceStore {
    config: StoreConfig,

    /// Current value of every slice.
    slices: RwLock<HashMap<String, Value>>,

    /// Reducers by slice, then by reducer name.
    reducers: RwLock<HashMap<String, HashMap<String, Reducer>>>,

    channel: SliceChannel,
}

static GLOBAL: OnceLock<Arc<SliceStore>> = OnceLock::new();

/// The process-wide default store, created empty on first use.
pub fn global() -> &'static Arc<SliceStore> {
    GLOBAL.get_or_init(|| {
        tracing::debug!("creating global slice store");
        Arc::new(SliceStore::new())
    })
}

impl SliceStore {
    /// Create an empty store with default configuration.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    /// Create an empty store.
    pub fn with_config(config: StoreConfig) -> Self {
        let channel = SliceChannel::with_warn_threshold(config.listener_warn_threshold);
        Self {
            config,
            slices: RwLock::new(HashMap::new()),
            reducers: RwLock::new(HashMap::new()),
            channel,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // --- Setup ---

    /// Describe the slices to install. Nothing changes until the plan is
    /// applied.
    pub fn describe(slices: impl IntoIterator<Item = SliceDescriptor>) -> StorePlan {
        StorePlan::new(slices)
    }

    /// Replace every slice with the plan's initial values.
    ///
    /// Prior slices, including ones the plan does not name, are discarded.
    /// Listeners stay registered and are not notified.
    pub fn apply(&self, plan: &StorePlan) {
        let mut slices = HashMap::with_capacity(plan.len());
        let mut reducers = HashMap::new();
        for slice in plan.slices() {
            slices.insert(slice.name.clone(), slice.initial_value.clone());
            reducers.insert(slice.name.clone(), slice.reducers.clone());
        }

        *self.slices.write() = slices;
        *self.reducers.write() = reducers;

        tracing::debug!(slices = plan.len(), "applied store plan");
    }

    /// Describe and apply in one step.
    pub fn initialize(&self, slices: impl IntoIterator<Item = SliceDescriptor>) {
        self.apply(&Self::describe(slices));
    }

    /// Describe now, return a closure that applies the plan when called.
    pub fn setup(
        self: &Arc<Self>,
        slices: impl IntoIterator<Item = SliceDescriptor>,
    ) -> impl FnOnce() + Send + 'static {
        let plan = Self::describe(slices);
        let store = Arc::clone(self);
        move || store.apply(&plan)
    }

    // --- Reads ---

    /// Current value of a slice, `None` if it was never installed or set.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.slices.read().get(name).cloned()
    }

    /// Current value of a slice converted to `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slices.read().contains_key(name)
    }

    /// Names of all slices, sorted.
    pub fn slice_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slices.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Copy of every slice.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot(
            self.slices
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    // --- Writes ---

    /// Replace a slice's value and notify its listeners.
    ///
    /// The slice does not need to exist beforehand.
    pub fn set(&self, name: &str, value: Value) {
        self.slices.write().insert(name.to_string(), value);
        tracing::trace!(slice = %name, "set");
        self.publish(name);
    }

    /// Serialize `value` and store it.
    pub fn set_as<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        self.set(name, serde_json::to_value(value)?);
        Ok(())
    }

    /// Compute a slice's next value from its current one and notify.
    ///
    /// `f` runs while the store is locked and must not call back into it.
    pub fn update<F>(&self, name: &str, f: F)
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        {
            let mut slices = self.slices.write();
            let next = f(slices.get(name));
            slices.insert(name.to_string(), next);
        }
        tracing::trace!(slice = %name, "update");
        self.publish(name);
    }

    /// Merge the fields of `partial` into an object slice and notify.
    ///
    /// One nested level is merged field by field; see
    /// [`merge_value`](crate::state::merge_value). On error the slice is
    /// unchanged and nothing is published.
    pub fn merge(&self, name: &str, partial: &Value) -> Result<()> {
        {
            let mut slices = self.slices.write();
            match slices.get_mut(name) {
                Some(current) => merge_value(name, current, partial)?,
                None if self.config.merge_missing_as_empty => {
                    let mut current = Value::Object(Map::new());
                    merge_value(name, &mut current, partial)?;
                    slices.insert(name.to_string(), current);
                }
                None => return Err(SliceError::SliceNotFound(name.to_string())),
            }
        }
        tracing::trace!(slice = %name, "merge");
        self.publish(name);
        Ok(())
    }

    /// Alias for [`merge`](Self::merge).
    pub fn reduce(&self, name: &str, partial: &Value) -> Result<()> {
        self.merge(name, partial)
    }

    /// Run a reducer registered for `name` and store its result.
    ///
    /// The reducer runs while the store is locked and must not call back
    /// into it.
    pub fn dispatch(&self, name: &str, reducer: &str, payload: &Value) -> Result<()> {
        let f = self
            .reducers
            .read()
            .get(name)
            .and_then(|r| r.get(reducer))
            .cloned()
            .ok_or_else(|| SliceError::ReducerNotFound {
                slice: name.to_string(),
                reducer: reducer.to_string(),
            })?;

        {
            let mut slices = self.slices.write();
            let current = slices
                .get_mut(name)
                .ok_or_else(|| SliceError::SliceNotFound(name.to_string()))?;
            *current = f(current, payload);
        }
        tracing::trace!(slice = %name, reducer = %reducer, "dispatch");
        self.publish(name);
        Ok(())
    }

    /// Notify the listeners of `name` without changing it.
    pub fn publish(&self, name: &str) {
        self.channel.publish(name, || self.get(name));
    }

    // --- Subscriptions ---

    /// Call `callback` with the slice's value after every write to it.
    ///
    /// The value is read when the callback's turn comes, so it reflects
    /// writes made by earlier listeners. If the slice is absent at that point
    /// (an explicit `publish` of an unknown name, or a concurrent
    /// `initialize` that removed it) the callback is skipped, not called.
    pub fn subscribe<F>(&self, name: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.channel.subscribe(name, callback)
    }

    /// Call `callback` with the name and value after every write to any slice.
    ///
    /// Skipped for slices that are absent at delivery, like `subscribe`.
    pub fn subscribe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.channel.subscribe_all(callback)
    }

    /// Receive a slice's updates over a bounded channel.
    pub fn subscribe_channel(&self, name: &str, config: ReceiverConfig) -> SliceReceiver {
        self.channel.subscribe_channel(name, config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.channel.unsubscribe(id);
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.channel.listener_count(name)
    }

    pub fn channel(&self) -> &SliceChannel {
        &self.channel
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            slice_count: self.slices.read().len() as u64,
            listener_count: self.channel.total_listeners() as u64,
            publish_count: self.channel.publish_count(),
        }
    }
}

impl Default for SliceStore {
    fn default() -> Self {
        Self::new()
    }
}
