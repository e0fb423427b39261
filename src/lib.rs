//! # Slice Bridge
//!
//! Named state slices shared between UI components and code outside the
//! component tree.
//!
//! ## Core Concepts
//!
//! - **Slices**: named JSON values held by a [`SliceStore`]
//! - **Plans**: slices are described first, then applied in one step
//! - **Subscriptions**: per-slice listeners, removed when their handle drops
//! - **Bindings**: keep a component's local cell in step with a slice
//!
//! ## Example
//!
//! ```ignore
//! use slice_bridge::{use_store_state, SliceDescriptor, SliceStore};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let store = Arc::new(SliceStore::new());
//! store.initialize(vec![SliceDescriptor::new("user", json!({"name": "ada"}))]);
//!
//! // Component side
//! let state = use_store_state(&store, "user");
//!
//! // Anywhere else
//! store.merge("user", &json!({"prefs": {"dark": true}}))?;
//! assert_eq!(state.value().unwrap()["prefs"]["dark"], true);
//! ```

pub mod bindings;
pub mod error;
pub mod state;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use bindings::{
    use_slice, use_slice_with, use_store_state, use_store_state_with, BindingOptions,
    RenderHook, SliceView, StateCell, StoreSetter, StoreState,
};
pub use error::{Result, SliceError};
pub use state::{merge_value, ContentHash, Equality};
pub use store::{global, SliceStore, StoreConfig};
pub use subscriptions::{
    DropReason, ReceiverConfig, SliceChannel, SliceEvent, SliceReceiver, Subscription,
    SubscriptionId,
};
pub use types::*;
