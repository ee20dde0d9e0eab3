//! Core channel traits and capability probing.

use {
    crate::{Result, handler::MessageHandler},
    async_trait::async_trait,
    relay_common::Message,
    std::{sync::Arc, time::Duration},
};

/// A named conduit for messages.
///
/// Identity is the name, unique within the hosting [`crate::ChannelRegistry`].
/// Channels are created once and referenced (never owned) by endpoints.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one message into the channel.
    async fn send(&self, message: Message) -> Result<()>;

    /// Push capability, when the channel delivers to registered subscribers.
    fn as_subscribable(&self) -> Option<&dyn SubscribableChannel> {
        None
    }

    /// Pull capability, when consumers retrieve messages themselves.
    fn as_pollable(&self) -> Option<&dyn PollableChannel> {
        None
    }

    /// The wrapped channel, when `self` is a decorator.
    fn inner(&self) -> Option<Arc<dyn MessageChannel>> {
        None
    }

    /// Whether a metrics interceptor is already present in the chain.
    fn is_instrumented(&self) -> bool {
        false
    }
}

/// Unwind decorator layers down to the physical channel instance.
#[must_use]
pub fn physical_channel(channel: &Arc<dyn MessageChannel>) -> Arc<dyn MessageChannel> {
    let mut current = Arc::clone(channel);
    while let Some(next) = current.inner() {
        current = next;
    }
    current
}

/// Push-capable channel: handlers subscribe and get messages delivered.
pub trait SubscribableChannel: MessageChannel {
    fn subscribe(&self, handler: Arc<dyn MessageHandler>) -> Result<()>;

    /// Remove a subscriber. Returns `false` when it was not subscribed.
    fn unsubscribe(&self, handler: &Arc<dyn MessageHandler>) -> bool;

    fn subscriber_count(&self) -> usize;
}

/// Pull-capable channel: consumers retrieve messages with an optional timeout.
#[async_trait]
pub trait PollableChannel: MessageChannel {
    /// Retrieve the next message.
    ///
    /// `None` blocks until a message arrives; `Some(Duration::ZERO)` is a
    /// non-blocking poll. Returns `Ok(None)` when the timeout elapses.
    async fn receive(&self, timeout: Option<Duration>) -> Result<Option<Message>>;

    /// Depth of the backing queue, for queue-backed channels.
    fn queue_depth(&self) -> Option<usize> {
        None
    }
}
