//! Read-only binding that mirrors a slice into a cell.

use super::cell::{RenderHook, StateCell};
use crate::store::SliceStore;
use crate::subscriptions::Subscription;
use serde_json::Value;

/// Read-only binding: a cell that mirrors a slice.
pub struct SliceView {
    cell: StateCell,
    _subscription: Subscription,
}

/// Mirror `name` into a new cell.
pub fn use_slice(store: &SliceStore, name: &str) -> SliceView {
    use_slice_with(store, name, None)
}

/// Mirror `name` into a new cell that calls `on_render` after each update.
///
/// Every store write overwrites the cell, equal or not.
pub fn use_slice_with(store: &SliceStore, name: &str, on_render: Option<RenderHook>) -> SliceView {
    let cell = StateCell::with_render_hook(store.get(name), on_render);

    let subscription = {
        let cell = cell.clone();
        store.subscribe(name, move |incoming| cell.set(Some(incoming.clone())))
    };

    SliceView {
        cell,
        _subscription: subscription,
    }
}

impl SliceView {
    pub fn value(&self) -> Option<Value> {
        self.cell.get()
    }

    pub fn cell(&self) -> &StateCell {
        &self.cell
    }

    pub fn unmount(self) {}
}
