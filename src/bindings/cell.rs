//! Reactive cell standing in for a component's local state.

use crate::state::Equality;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Called after every cell update; stands in for a host re-render.
pub type RenderHook = Arc<dyn Fn() + Send + Sync>;

struct CellInner {
    value: RwLock<Option<Value>>,
    version: AtomicU64,
    on_render: Option<RenderHook>,
}

/// Reactive cell holding a component's copy of a slice.
///
/// Clones share the same cell.
#[derive(Clone)]
pub struct StateCell {
    inner: Arc<CellInner>,
}

impl StateCell {
    pub fn new(initial: Option<Value>) -> Self {
        Self::with_render_hook(initial, None)
    }

    pub fn with_render_hook(initial: Option<Value>, on_render: Option<RenderHook>) -> Self {
        Self {
            inner: Arc::new(CellInner {
                value: RwLock::new(initial),
                version: AtomicU64::new(0),
                on_render,
            }),
        }
    }

    pub fn get(&self) -> Option<Value> {
        self.inner.value.read().clone()
    }

    /// Read the value without cloning.
    pub fn with<R>(&self, f: impl FnOnce(Option<&Value>) -> R) -> R {
        f((*self.inner.value.read()).as_ref())
    }

    /// Number of updates since creation.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Store `value` unconditionally.
    pub fn set(&self, value: Option<Value>) {
        *self.inner.value.write() = value;
        self.bump();
    }

    /// Store `value` unless `equality` says it matches the held value.
    /// Returns whether the cell changed.
    pub fn replace_if_changed(&self, value: Option<Value>, equality: &Equality) -> bool {
        {
            let mut held = self.inner.value.write();
            if equality.same((*held).as_ref(), value.as_ref()) {
                return false;
            }
            *held = value;
        }
        self.bump();
        true
    }

    fn bump(&self) {
        self.inner.version.fetch_add(1, Ordering::AcqRel);
        if let Some(hook) = &self.inner.on_render {
            hook();
        }
    }
}

impl fmt::Debug for StateCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCell")
            .field("value", &*self.inner.value.read())
            .field("version", &self.version())
            .finish()
    }
}
