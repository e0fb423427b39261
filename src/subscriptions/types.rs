//! Subscription handles and channel events.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Weak;

use super::manager::ChannelInner;

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Configuration for a channel receiver.
#[derive(Clone, Debug)]
pub struct ReceiverConfig {
    /// Max buffered events before the receiver is dropped.
    /// Default: 1000
    pub buffer_size: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self { buffer_size: 1000 }
    }
}

/// Events delivered to channel receivers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SliceEvent {
    /// The slice was written. `value` is the value at publish time.
    Updated { slice: String, value: Value },

    /// The receiver was removed and will get no further events.
    Dropped { reason: DropReason },
}

/// Why a receiver was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Buffer overflowed (slow consumer).
    BufferOverflow,
    /// The receiving end was gone at delivery time.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// A registered listener. Dropping the handle removes the listener.
#[must_use = "dropping a Subscription immediately removes the listener"]
pub struct Subscription {
    id: SubscriptionId,
    slice: Option<String>,
    channel: Weak<ChannelInner>,
    detached: bool,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, slice: Option<String>, channel: Weak<ChannelInner>) -> Self {
        Self {
            id,
            slice,
            channel,
            detached: false,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Slice this listener watches, `None` for wildcard listeners.
    pub fn slice(&self) -> Option<&str> {
        self.slice.as_deref()
    }

    /// Keep the listener registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.detached = true;
    }

    /// Remove the listener now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        if let Some(channel) = self.channel.upgrade() {
            channel.remove(self.id, DropReason::Unsubscribed);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("slice", &self.slice)
            .field("detached", &self.detached)
            .finish()
    }
}

/// Receiving end of a channel subscription.
pub struct SliceReceiver {
    subscription: Subscription,
    receiver: crossbeam_channel::Receiver<SliceEvent>,
}

impl SliceReceiver {
    pub(crate) fn new(
        subscription: Subscription,
        receiver: crossbeam_channel::Receiver<SliceEvent>,
    ) -> Self {
        Self {
            subscription,
            receiver,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<SliceEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<SliceEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<SliceEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Underlying receiver, for use with `crossbeam_channel::select!`.
    pub fn receiver(&self) -> &crossbeam_channel::Receiver<SliceEvent> {
        &self.receiver
    }
}
