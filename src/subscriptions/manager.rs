//! Listener registry and per-slice delivery.

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{
    DropReason, ReceiverConfig, SliceEvent, SliceReceiver, Subscription, SubscriptionId,
};

/// Default listener count per slice at which accumulation is reported.
pub const DEFAULT_LISTENER_WARN_THRESHOLD: usize = 64;

type Callback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

#[derive(Clone)]
enum Sink {
    Callback(Callback),
    Channel(Sender<SliceEvent>),
}

/// Internal listener state.
#[derive(Clone)]
struct Listener {
    id: SubscriptionId,
    sink: Sink,
    /// Cleared on removal so in-flight deliveries skip it.
    active: Arc<AtomicBool>,
}

impl Listener {
    fn new(id: SubscriptionId, sink: Sink) -> Self {
        Self {
            id,
            sink,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Where a listener is registered.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Key {
    Slice(String),
    All,
}

#[derive(Default)]
struct Registry {
    by_slice: HashMap<String, Vec<Listener>>,
    wildcard: Vec<Listener>,
    index: HashMap<SubscriptionId, Key>,
    /// Slices currently above the warn threshold.
    warned: HashSet<String>,
}

impl Registry {
    fn insert(&mut self, key: Key, listener: Listener) -> usize {
        self.index.insert(listener.id, key.clone());
        match key {
            Key::Slice(name) => {
                let list = self.by_slice.entry(name).or_default();
                list.push(listener);
                list.len()
            }
            Key::All => {
                self.wildcard.push(listener);
                self.wildcard.len()
            }
        }
    }

    fn remove(&mut self, id: SubscriptionId, warn_threshold: usize) -> Option<Listener> {
        let key = self.index.remove(&id)?;
        let list = match &key {
            Key::Slice(name) => self.by_slice.get_mut(name)?,
            Key::All => &mut self.wildcard,
        };
        let pos = list.iter().position(|l| l.id == id)?;
        let listener = list.remove(pos);
        listener.active.store(false, Ordering::Release);

        if let Key::Slice(name) = key {
            let remaining = list.len();
            if remaining == 0 {
                self.by_slice.remove(&name);
            }
            if remaining < warn_threshold {
                self.warned.remove(&name);
            }
        }
        Some(listener)
    }
}

pub(crate) struct ChannelInner {
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    publish_count: AtomicU64,
    /// Threshold warnings emitted so far.
    warnings: AtomicU64,
    warn_threshold: usize,
}

impl ChannelInner {
    pub(crate) fn remove(&self, id: SubscriptionId, reason: DropReason) {
        let removed = self.registry.write().remove(id, self.warn_threshold);
        if let Some(listener) = removed {
            tracing::debug!(?id, ?reason, "listener removed");
            if let Sink::Channel(sender) = listener.sink {
                // Best effort, the receiver may already be gone.
                let _ = sender.try_send(SliceEvent::Dropped { reason });
            }
        }
    }
}

/// Registry of slice listeners.
///
/// Listeners are keyed by slice name, so a publish only reaches the listeners
/// of that slice plus wildcard listeners. Delivery is synchronous and no lock
/// is held while a listener runs, so listeners may call back into the store.
#[derive(Clone)]
pub struct SliceChannel {
    inner: Arc<ChannelInner>,
}

impl SliceChannel {
    /// Create a new channel.
    pub fn new() -> Self {
        Self::with_warn_threshold(DEFAULT_LISTENER_WARN_THRESHOLD)
    }

    /// Create a new channel reporting slices that reach `threshold` listeners.
    pub fn with_warn_threshold(threshold: usize) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                registry: RwLock::new(Registry::default()),
                next_id: AtomicU64::new(1),
                publish_count: AtomicU64::new(0),
                warnings: AtomicU64::new(0),
                warn_threshold: threshold,
            }),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn register(&self, key: Key, sink: Sink) -> Subscription {
        let id = self.next_id();
        let listener = Listener::new(id, sink);
        let slice = match &key {
            Key::Slice(name) => Some(name.clone()),
            Key::All => None,
        };

        {
            let mut registry = self.inner.registry.write();
            let count = registry.insert(key, listener);
            if let Some(name) = &slice {
                if count >= self.inner.warn_threshold && registry.warned.insert(name.clone()) {
                    self.inner.warnings.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        slice = %name,
                        listeners = count,
                        "slice listener count reached warn threshold, are subscriptions being dropped?"
                    );
                }
            }
        }

        tracing::debug!(?id, slice = ?slice, "listener registered");
        Subscription::new(id, slice, Arc::downgrade(&self.inner))
    }

    /// Register a callback for one slice.
    ///
    /// Registering the same callback again adds a second listener. The
    /// listener lives until the returned handle is dropped.
    pub fn subscribe<F>(&self, name: &str, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(move |_: &str, value: &Value| callback(value));
        self.register(Key::Slice(name.to_string()), Sink::Callback(callback))
    }

    /// Register a callback for every slice.
    pub fn subscribe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.register(Key::All, Sink::Callback(Arc::new(callback)))
    }

    /// Register a bounded receiver for one slice.
    ///
    /// Receivers get a snapshot of the value taken at publish time, before any
    /// callback listener can rewrite the slice. A receiver whose buffer is full
    /// is dropped.
    pub fn subscribe_channel(&self, name: &str, config: ReceiverConfig) -> SliceReceiver {
        let (sender, receiver) = bounded(config.buffer_size);
        let subscription = self.register(Key::Slice(name.to_string()), Sink::Channel(sender));
        SliceReceiver::new(subscription, receiver)
    }

    /// Remove a listener. Channel receivers get a `Dropped` event.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.remove(id, DropReason::Unsubscribed);
    }

    /// Notify every listener of `name`.
    ///
    /// Channel receivers are fed first, with one snapshot read before any
    /// callback runs, so they see values in publish order. Callbacks then run
    /// in turn and `read` is called again for each one, so a callback sees
    /// writes made by callbacks that ran before it. Listeners are skipped
    /// while `read` returns `None`.
    pub fn publish<R>(&self, name: &str, read: R)
    where
        R: Fn() -> Option<Value>,
    {
        self.inner.publish_count.fetch_add(1, Ordering::Relaxed);

        let targets: Vec<Listener> = {
            let registry = self.inner.registry.read();
            registry
                .by_slice
                .get(name)
                .into_iter()
                .flatten()
                .chain(registry.wildcard.iter())
                .cloned()
                .collect()
        };

        tracing::trace!(slice = %name, listeners = targets.len(), "publish");

        let mut overflowed = Vec::new();
        let mut disconnected = Vec::new();

        let has_receivers = targets
            .iter()
            .any(|l| matches!(l.sink, Sink::Channel(_)));
        let snapshot = if has_receivers { read() } else { None };

        if let Some(snapshot) = &snapshot {
            for listener in &targets {
                let Sink::Channel(sender) = &listener.sink else {
                    continue;
                };
                if !listener.is_active() {
                    continue;
                }
                let event = SliceEvent::Updated {
                    slice: name.to_string(),
                    value: snapshot.clone(),
                };
                match sender.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => overflowed.push(listener.id),
                    Err(TrySendError::Disconnected(_)) => disconnected.push(listener.id),
                }
            }
        }

        for listener in &targets {
            let Sink::Callback(callback) = &listener.sink else {
                continue;
            };
            if !listener.is_active() {
                continue;
            }
            match read() {
                Some(value) => callback(name, &value),
                None => tracing::trace!(slice = %name, "slice absent at delivery, skipping"),
            }
        }

        for id in overflowed {
            tracing::warn!(slice = %name, ?id, "dropping slow receiver");
            self.inner.remove(id, DropReason::BufferOverflow);
        }
        for id in disconnected {
            self.inner.remove(id, DropReason::Disconnected);
        }
    }

    /// Live listeners registered for `name`, wildcards excluded.
    pub fn listener_count(&self, name: &str) -> usize {
        self.inner
            .registry
            .read()
            .by_slice
            .get(name)
            .map_or(0, Vec::len)
    }

    /// Live listeners across all slices, wildcards included.
    pub fn total_listeners(&self) -> usize {
        self.inner.registry.read().index.len()
    }

    /// Number of publishes so far.
    pub fn publish_count(&self) -> u64 {
        self.inner.publish_count.load(Ordering::Relaxed)
    }

    /// Number of listener threshold warnings emitted so far.
    ///
    /// A slice is reported once each time its listener count climbs to the
    /// threshold, not on every registration above it.
    pub fn threshold_warnings(&self) -> u64 {
        self.inner.warnings.load(Ordering::Relaxed)
    }
}

impl Default for SliceChannel {
    fn default() -> Self {
        Self::new()
    }
}
