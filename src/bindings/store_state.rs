//! Two-way binding between a component cell and a store slice.

use super::cell::{RenderHook, StateCell};
use crate::state::Equality;
use crate::store::SliceStore;
use crate::subscriptions::Subscription;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// Options for a two-way binding.
#[derive(Clone, Default)]
pub struct BindingOptions {
    /// Decides whether a store value differs from the cell's.
    pub equality: Equality,

    /// Called after every cell update.
    pub on_render: Option<RenderHook>,
}

impl std::fmt::Debug for BindingOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingOptions")
            .field("equality", &self.equality)
            .field("on_render", &self.on_render.is_some())
            .finish()
    }
}

impl BindingOptions {
    pub fn with_equality(mut self, equality: Equality) -> Self {
        self.equality = equality;
        self
    }

    pub fn with_render_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_render = Some(Arc::new(hook));
        self
    }
}

/// Two-way binding between a component cell and a slice.
///
/// Dropping it removes the binding's listener.
pub struct StoreState {
    name: String,
    store: Arc<SliceStore>,
    cell: StateCell,
    equality: Equality,
    /// Cell version last written back to the store.
    synced_version: Mutex<Option<u64>>,
    _subscription: Subscription,
}

/// Bind a cell to `name` with structural equality.
pub fn use_store_state(store: &Arc<SliceStore>, name: &str) -> StoreState {
    use_store_state_with(store, name, BindingOptions::default())
}

/// Bind a cell to `name`.
///
/// The cell starts from the slice's current value. Store writes replace the
/// cell only when they differ under `options.equality`.
pub fn use_store_state_with(
    store: &Arc<SliceStore>,
    name: &str,
    options: BindingOptions,
) -> StoreState {
    let cell = StateCell::with_render_hook(store.get(name), options.on_render);

    let subscription = {
        let cell = cell.clone();
        let equality = options.equality.clone();
        store.subscribe(name, move |incoming| {
            cell.replace_if_changed(Some(incoming.clone()), &equality);
        })
    };

    StoreState {
        name: name.to_string(),
        store: Arc::clone(store),
        cell,
        equality: options.equality,
        synced_version: Mutex::new(None),
        _subscription: subscription,
    }
}

impl StoreState {
    /// The component's current value.
    pub fn value(&self) -> Option<Value> {
        self.cell.get()
    }

    pub fn setter(&self) -> StoreSetter {
        StoreSetter {
            name: self.name.clone(),
            store: Arc::clone(&self.store),
            cell: self.cell.clone(),
            equality: self.equality.clone(),
        }
    }

    /// Value and setter together.
    pub fn pair(&self) -> (Option<Value>, StoreSetter) {
        (self.value(), self.setter())
    }

    pub fn cell(&self) -> &StateCell {
        &self.cell
    }

    pub fn slice(&self) -> &str {
        &self.name
    }

    /// Post-render step: write the cell back to the store if it changed since
    /// the last write-back.
    ///
    /// The first call after binding always writes back. An absent value is
    /// never written. Returns whether a write happened.
    pub fn after_render(&self) -> bool {
        let version = self.cell.version();
        {
            let mut synced = self.synced_version.lock();
            if *synced == Some(version) {
                return false;
            }
            *synced = Some(version);
        }

        match self.cell.get() {
            Some(value) => {
                tracing::trace!(slice = %self.name, version, "binding write-back");
                self.store.set(&self.name, value);
                true
            }
            None => false,
        }
    }

    /// Remove the binding's listener.
    pub fn unmount(self) {}
}

/// Writes a value to both the store and the bound cell.
#[derive(Clone)]
pub struct StoreSetter {
    name: String,
    store: Arc<SliceStore>,
    cell: StateCell,
    equality: Equality,
}

impl StoreSetter {
    /// Store `value`, then update the cell if it still differs.
    pub fn set(&self, value: Value) {
        self.store.set(&self.name, value.clone());
        self.cell.replace_if_changed(Some(value), &self.equality);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SliceDescriptor;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_store() -> Arc<SliceStore> {
        let store = Arc::new(SliceStore::new());
        store.initialize(vec![SliceDescriptor::new("form", json!({"title": "draft"}))]);
        store
    }

    #[test]
    fn test_seeds_from_store() {
        let store = test_store();
        let state = use_store_state(&store, "form");
        assert_eq!(state.value(), Some(json!({"title": "draft"})));
        assert_eq!(state.cell().version(), 0);
    }

    #[test]
    fn test_store_write_reaches_cell() {
        let store = test_store();
        let state = use_store_state(&store, "form");

        store.set("form", json!({"title": "final"}));
        assert_eq!(state.value(), Some(json!({"title": "final"})));
        assert_eq!(state.cell().version(), 1);
    }

    #[test]
    fn test_equal_write_is_ignored() {
        let store = test_store();
        let state = use_store_state(&store, "form");

        store.set("form", json!({"title": "draft"}));
        assert_eq!(state.cell().version(), 0);
    }

    #[test]
    fn test_setter_updates_cell_once() {
        let store = test_store();
        let state = use_store_state(&store, "form");
        let setter = state.setter();

        setter.set(json!({"title": "x"}));
        setter.set(json!({"title": "x"}));

        assert_eq!(state.cell().version(), 1);
        assert_eq!(store.get("form"), Some(json!({"title": "x"})));
    }

    #[test]
    fn test_after_render_writes_back_changes() {
        let store = test_store();
        let state = use_store_state(&store, "form");

        // Mount writes the seeded value back once.
        assert!(state.after_render());
        assert!(!state.after_render());

        state.cell().set(Some(json!({"title": "local"})));
        assert!(state.after_render());
        assert_eq!(store.get("form"), Some(json!({"title": "local"})));
    }

    #[test]
    fn test_after_render_skips_absent() {
        let store = Arc::new(SliceStore::new());
        let state = use_store_state(&store, "nothing");

        assert_eq!(state.value(), None);
        assert!(!state.after_render());
        assert!(!store.contains("nothing"));
    }

    #[test]
    fn test_render_hook_runs_on_update() {
        let store = test_store();
        let renders = Arc::new(AtomicUsize::new(0));
        let renders_clone = renders.clone();
        let options = BindingOptions::default().with_render_hook(move || {
            renders_clone.fetch_add(1, Ordering::SeqCst);
        });
        let _state = use_store_state_with(&store, "form", options);

        store.set("form", json!({"title": "a"}));
        store.set("form", json!({"title": "a"}));
        store.set("form", json!({"title": "b"}));

        assert_eq!(renders.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unmount_releases_listener() {
        let store = test_store();
        let state = use_store_state(&store, "form");
        assert_eq!(store.listener_count("form"), 1);

        state.unmount();
        assert_eq!(store.listener_count("form"), 0);
    }
}
