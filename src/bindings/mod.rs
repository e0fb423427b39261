//! Bindings between a component's local state and a slice.
//!
//! The host UI framework is modelled by [`StateCell`]: a value holder that
//! counts its updates and calls a render hook after each one. Two adapters
//! wire a cell to a slice:
//!
//! - [`use_store_state`]: two-way. Store writes flow into the cell when they
//!   differ under the binding's [`Equality`](crate::state::Equality); cell
//!   changes flow back into the store from [`StoreState::after_render`].
//! - [`use_slice`]: read-only. Every store write overwrites the cell.
//!
//! A binding owns its subscription, so dropping the binding (unmounting the
//! component) removes its listener.

mod cell;
mod slice_view;
mod store_state;

pub use cell::{RenderHook, StateCell};
pub use slice_view::{use_slice, use_slice_with, SliceView};
pub use store_state::{
    use_store_state, use_store_state_with, BindingOptions, StoreSetter, StoreState,
};
