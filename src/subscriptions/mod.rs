//! Notification channel for slice updates.
//!
//! Listeners come in three forms:
//! - Callbacks on one slice, invoked synchronously on every write
//! - Wildcard callbacks, invoked for every slice
//! - Bounded channel receivers, for consumers on other threads
//!
//! Every registration returns a handle; dropping it removes the listener.
//!
//! # Example
//!
//! ```ignore
//! let channel = SliceChannel::new();
//!
//! let sub = channel.subscribe("user", |value| println!("user is now {}", value));
//! channel.publish("user", || Some(json!({"name": "ada"})));
//!
//! drop(sub); // no further deliveries
//! ```

mod manager;
mod types;

pub use manager::{SliceChannel, DEFAULT_LISTENER_WARN_THRESHOLD};
pub use types::{
    DropReason, ReceiverConfig, SliceEvent, SliceReceiver, Subscription, SubscriptionId,
};
